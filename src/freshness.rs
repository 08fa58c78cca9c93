//! Staleness coloring for the "last updated" column
//!
//! Timestamps younger than a day keep the palette's fresh color, anything
//! four days or older gets the stale color, and the three days in between
//! blend linearly band by band.

use chrono::{DateTime, Utc};
use std::fmt;

/// Hours at which each palette anchor applies
const ANCHOR_HOURS: [f64; 4] = [24.0, 48.0, 72.0, 96.0];

const BAND_HOURS: f64 = 24.0;

/// Cells strictly older than this are italicized
pub const ITALIC_AFTER_HOURS: f64 = 72.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Light theme: near-black text drifting to amber, orange, then red
pub const LIGHT_PALETTE: [Rgb; 4] = [
    Rgb(33, 37, 41),
    Rgb(184, 134, 11),
    Rgb(230, 81, 0),
    Rgb(198, 40, 40),
];

/// Dark theme: near-white text drifting to yellow, orange, then soft red
pub const DARK_PALETTE: [Rgb; 4] = [
    Rgb(222, 226, 230),
    Rgb(255, 213, 79),
    Rgb(255, 152, 0),
    Rgb(239, 83, 80),
];

fn palette(is_dark: bool) -> &'static [Rgb; 4] {
    if is_dark { &DARK_PALETTE } else { &LIGHT_PALETTE }
}

pub fn fresh_color(is_dark: bool) -> Rgb {
    palette(is_dark)[0]
}

pub fn stale_color(is_dark: bool) -> Rgb {
    palette(is_dark)[3]
}

/// Text color for a timestamp that is `age_hours` old.
///
/// Negative and NaN ages count as fresh.
pub fn age_color(age_hours: f64, is_dark: bool) -> Rgb {
    let anchors = palette(is_dark);

    if age_hours.is_nan() || age_hours < ANCHOR_HOURS[0] {
        return anchors[0];
    }
    if age_hours >= ANCHOR_HOURS[3] {
        return anchors[3];
    }

    let offset = age_hours - ANCHOR_HOURS[0];
    let band = ((offset / BAND_HOURS) as usize).min(2);
    let t = (offset - band as f64 * BAND_HOURS) / BAND_HOURS;

    lerp(anchors[band], anchors[band + 1], t)
}

pub fn is_italic(age_hours: f64) -> bool {
    age_hours > ITALIC_AFTER_HOURS
}

/// Hours elapsed between `last_updated` and `now`, negative for future stamps
pub fn age_hours(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - last_updated).num_milliseconds() as f64 / 3_600_000.0
}

fn lerp(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let channel = |a: u8, b: u8| -> u8 {
        let value = a as f64 + (b as f64 - a as f64) * t;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgb(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}
