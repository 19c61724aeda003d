/*
 *  view.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Boot and flight screens for the 2.13" e-ink panel
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

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle, ascii::{FONT_6X10, FONT_7X13, FONT_10X20}},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Baseline, Text},
};
use log::warn;
use std::fmt;
use std::str::FromStr;

use crate::flight::FlightRecord;
use crate::session::SessionStats;
use crate::vframebuf::FrameBuf;

const SMALL: &MonoFont<'static> = &FONT_6X10;
const MEDIUM: &MonoFont<'static> = &FONT_7X13;
const HUGE: &MonoFont<'static> = &FONT_10X20;

const MARGIN: i32 = 5;
const COL_2: i32 = 80;
const COL_3: i32 = 155;
const TOP_RULE: i32 = 15;
const BODY_TOP: i32 = 20;
const BODY_STEP: i32 = 16;
const PHRASE_CHARS: usize = 32;

/// A body line on the flight screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayField {
    From,
    Airline,
    Model,
    Reg,
    Route,
}

impl FromStr for DisplayField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FROM" => Ok(DisplayField::From),
            "AIRLINE" => Ok(DisplayField::Airline),
            "MODEL" => Ok(DisplayField::Model),
            "REG" => Ok(DisplayField::Reg),
            "ROUTE" => Ok(DisplayField::Route),
            other => Err(format!("unknown display field '{}'", other)),
        }
    }
}

impl fmt::Display for DisplayField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayField::From => "FROM",
            DisplayField::Airline => "AIRLINE",
            DisplayField::Model => "MODEL",
            DisplayField::Reg => "REG",
            DisplayField::Route => "ROUTE",
        })
    }
}

impl DisplayField {
    pub fn line(&self, flight: &FlightRecord) -> String {
        match self {
            DisplayField::From => format!("FROM: {}", flight.origin),
            DisplayField::Airline => format!("AIRLINE: {}", flight.airline),
            DisplayField::Model => format!("MODEL: {}", flight.aircraft),
            DisplayField::Reg => format!("REG: {}", flight.registration),
            DisplayField::Route => format!("{} -> {}", flight.origin, flight.destination),
        }
    }

    /// Parse the configured names, dropping (and logging) any unknown ones.
    pub fn parse_list(names: &[String]) -> Vec<DisplayField> {
        names
            .iter()
            .filter_map(|n| n.parse::<DisplayField>().inspect_err(|e| warn!("{}", e)).ok())
            .collect()
    }
}

/// Cut to `max` characters, ending in "..." when anything was dropped.
pub fn truncate(text: &str, max: usize) -> String {
    const SUFFIX: &str = "...";
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(SUFFIX.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(SUFFIX);
    out
}

pub struct FlightView {
    width: u32,
    height: u32,
    rotate: bool,
}

impl FlightView {
    pub fn new(width: u32, height: u32, rotate: bool) -> Self {
        Self { width, height, rotate }
    }

    fn blank(&self) -> FrameBuf<BinaryColor> {
        FrameBuf::new(self.width, self.height, BinaryColor::Off)
    }

    fn bottom_rule(&self) -> i32 {
        self.height as i32 - 15
    }

    fn bottom_row(&self) -> i32 {
        self.height as i32 - 12
    }

    /// How many glyphs of `font` fit between the side margins.
    fn fit(&self, font: &MonoFont<'_>) -> usize {
        let advance = font.character_size.width + font.character_spacing;
        ((self.width as i32 - 2 * MARGIN).max(0) as u32 / advance.max(1)) as usize
    }

    fn text(fb: &mut FrameBuf<BinaryColor>, s: &str, x: i32, y: i32, font: &MonoFont<'_>) {
        let style = MonoTextStyle::new(font, BinaryColor::On);
        // drawing into a FrameBuf cannot fail
        let _ = Text::with_baseline(s, Point::new(x, y), style, Baseline::Top).draw(fb);
    }

    fn rule(&self, fb: &mut FrameBuf<BinaryColor>, y: i32) {
        let _ = Line::new(Point::new(-5, y), Point::new(self.width as i32, y))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(fb);
    }

    fn finish(&self, mut fb: FrameBuf<BinaryColor>) -> FrameBuf<BinaryColor> {
        if self.rotate {
            fb.rotate_180();
        }
        fb
    }

    pub fn render_boot(&self, face: &str, phrase: &str, clock: &str) -> FrameBuf<BinaryColor> {
        let mut fb = self.blank();
        self.rule(&mut fb, TOP_RULE);
        Self::text(&mut fb, &truncate(phrase, PHRASE_CHARS.min(self.fit(MEDIUM))), MARGIN, BODY_TOP, MEDIUM);
        Self::text(&mut fb, face, MARGIN, 52, HUGE);
        self.rule(&mut fb, self.bottom_rule());
        Self::text(&mut fb, &format!("TIME: {}", clock), COL_3, self.bottom_row(), SMALL);
        self.finish(fb)
    }

    /// Body text for `flight`, one line per configured field, already fitted.
    pub fn body_lines(&self, flight: &FlightRecord, fields: &[DisplayField]) -> Vec<String> {
        let max = self.fit(MEDIUM);
        fields.iter().map(|f| truncate(&f.line(flight), max)).collect()
    }

    pub fn render_flight(
        &self,
        flight: &FlightRecord,
        stats: &SessionStats,
        fields: &[DisplayField],
        clock: &str,
    ) -> FrameBuf<BinaryColor> {
        let mut fb = self.blank();

        let col = (COL_2 - MARGIN - 2).max(0) as u32 / (SMALL.character_size.width + SMALL.character_spacing);
        Self::text(&mut fb, &truncate(&format!("ATC: {}", flight.callsign), col as usize), MARGIN, 2, SMALL);
        Self::text(&mut fb, &format!("COUNT: {}", stats.flights_count), COL_2, 2, SMALL);
        Self::text(&mut fb, &format!("TIMER: {}", stats.elapsed_str), COL_3, 2, SMALL);
        self.rule(&mut fb, TOP_RULE);

        let bottom = self.bottom_rule();
        for (i, line) in self.body_lines(flight, fields).iter().enumerate() {
            let y = BODY_TOP + i as i32 * BODY_STEP;
            if y + MEDIUM.character_size.height as i32 > bottom {
                break;
            }
            Self::text(&mut fb, line, MARGIN, y, MEDIUM);
        }

        self.rule(&mut fb, bottom);
        Self::text(&mut fb, &format!("ALT: {} ft", flight.altitude_ft), MARGIN, self.bottom_row(), SMALL);
        Self::text(&mut fb, &format!("SPD: {} kt", flight.speed), COL_2, self.bottom_row(), SMALL);
        Self::text(&mut fb, &format!("TIME: {}", clock), COL_3, self.bottom_row(), SMALL);

        self.finish(fb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight() -> FlightRecord {
        FlightRecord {
            id: "3a1b".into(),
            callsign: "BAW1442".into(),
            registration: "G-EUUU".into(),
            aircraft: "A320".into(),
            airline: "BAW".into(),
            origin: "LHR".into(),
            destination: "EDI".into(),
            altitude_ft: 3500,
            speed: 180,
            heading: 270,
            latitude: 51.48,
            longitude: -0.19,
            distance_m: 1200.0,
            timestamp: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn ink(fb: &FrameBuf<BinaryColor>) -> usize {
        fb.as_slice().iter().filter(|c| c.is_on()).count()
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("FROM: London Heathrow Airport", 12), "FROM: Lon...");
        assert_eq!(truncate("abcdef", 6), "abcdef");
    }

    #[test]
    fn test_field_lines() {
        let f = flight();
        assert_eq!(DisplayField::Route.line(&f), "LHR -> EDI");
        assert_eq!(DisplayField::Model.line(&f), "MODEL: A320");
        let parsed = DisplayField::parse_list(&["from".into(), "SQUAWK".into(), "REG".into()]);
        assert_eq!(parsed, vec![DisplayField::From, DisplayField::Reg]);
    }

    #[test]
    fn test_body_lines_fit_width() {
        let view = FlightView::new(250, 122, false);
        let mut f = flight();
        f.origin = "A".repeat(80);
        let lines = view.body_lines(&f, &[DisplayField::From]);
        assert!(lines[0].ends_with("..."));
        assert!(lines[0].chars().count() * 7 <= 240);
    }

    #[test]
    fn test_flight_screen_has_ink() {
        let view = FlightView::new(250, 122, false);
        let stats = SessionStats { flights_count: 3, elapsed_time: 65, elapsed_str: "00:01:05".into(), location_short: String::new() };
        let fb = view.render_flight(&flight(), &stats, &DisplayField::parse_list(&["FROM".into()]), "12:00:00");
        assert_eq!(fb.width(), 250);
        assert_eq!(fb.height(), 122);
        assert!(ink(&fb) > 0);
        // top rule spans the width
        assert!((0..250).all(|x| fb.pixel(x, TOP_RULE as usize) == Some(BinaryColor::On)));
    }

    #[test]
    fn test_rotation_flips_frame() {
        let upright = FlightView::new(250, 122, false).render_boot("(O__O)", "Ready for takeoff!", "12:00:00");
        let mut flipped = FlightView::new(250, 122, true).render_boot("(O__O)", "Ready for takeoff!", "12:00:00");
        assert_ne!(upright, flipped);
        flipped.rotate_180();
        assert_eq!(upright, flipped);
    }
}
