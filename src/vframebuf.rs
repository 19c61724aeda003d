/*
 *  vframebuf.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized frame buffer the e-ink screens are drawn into
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{BinaryColor, PixelColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// A runtime-sized framebuffer for embedded-graphics.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuf<C: PixelColor> {
    buf: Vec<C>,
    w: usize,
    h: usize,
}

impl<C: PixelColor> FrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    pub fn as_slice(&self) -> &[C] { &self.buf }

    pub fn clear_color(&mut self, color: C) {
        self.buf.fill(color);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<C> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    /// Turn the image upside down in place; the panel is mounted inverted.
    pub fn rotate_180(&mut self) {
        self.buf.reverse();
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl FrameBuf<BinaryColor> {
    /// Binary PBM (P4). `On` is ink, written as a set bit; rows pad to a byte.
    pub fn to_pbm(&self) -> Vec<u8> {
        let row_bytes = self.w.div_ceil(8);
        let header = format!("P4\n{} {}\n", self.w, self.h);
        let mut out = Vec::with_capacity(header.len() + row_bytes * self.h);
        out.extend_from_slice(header.as_bytes());

        for row in self.buf.chunks(self.w.max(1)) {
            let mut packed = vec![0u8; row_bytes];
            for (x, c) in row.iter().enumerate() {
                if c.is_on() {
                    packed[x / 8] |= 0x80 >> (x % 8);
                }
            }
            out.extend_from_slice(&packed);
        }
        out
    }
}

impl<C: PixelColor> OriginDimensions for FrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl<C: PixelColor> DrawTarget for FrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // colors arrive row-major for the whole area, clipped points still consume one
        let points = area.points();
        for (p, c) in points.zip(colors) {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_fill_clips_at_edges() {
        let mut fb = FrameBuf::new(4, 3, BinaryColor::Off);
        Rectangle::new(Point::new(-1, 1), Size::new(3, 5))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();
        // columns 0..2, rows 1..3 only; nothing wraps into the next row
        assert_eq!(fb.pixel(0, 1), Some(BinaryColor::On));
        assert_eq!(fb.pixel(1, 2), Some(BinaryColor::On));
        assert_eq!(fb.pixel(2, 1), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(3, 0), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::Off));
    }

    #[test]
    fn test_fill_contiguous_offset_area() {
        let mut fb = FrameBuf::new(4, 4, BinaryColor::Off);
        let area = Rectangle::new(Point::new(3, 3), Size::new(2, 2));
        fb.fill_contiguous(&area, [BinaryColor::On; 4]).unwrap();
        assert_eq!(fb.as_slice().iter().filter(|c| c.is_on()).count(), 1);
        assert_eq!(fb.pixel(3, 3), Some(BinaryColor::On));
    }

    #[test]
    fn test_rotate_180() {
        let mut fb = FrameBuf::new(3, 2, BinaryColor::Off);
        Pixel(Point::new(0, 0), BinaryColor::On).draw(&mut fb).unwrap();
        fb.rotate_180();
        assert_eq!(fb.pixel(2, 1), Some(BinaryColor::On));
        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::Off));
    }

    #[test]
    fn test_pbm_packing() {
        let mut fb = FrameBuf::new(10, 2, BinaryColor::Off);
        Pixel(Point::new(0, 0), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(9, 1), BinaryColor::On).draw(&mut fb).unwrap();
        let pbm = fb.to_pbm();
        let header = b"P4\n10 2\n";
        assert_eq!(&pbm[..header.len()], header);
        assert_eq!(&pbm[header.len()..], &[0x80, 0x00, 0x00, 0x40]);
    }
}
