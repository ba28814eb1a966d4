//! 16x2 character display frames.
//!
//! Rendering is pure: the service builds a [`DisplayFrame`] from current
//! state and a [`DisplayPort`](crate::app::ports::DisplayPort) pushes it to
//! the panel.  Lines are always exactly 16 characters, space padded, so the
//! driver can overwrite in place without clearing.

use core::fmt::Write;

use heapless::String;

use crate::clock::WallClock;
use crate::feeding::SystemState;
use crate::scheduler::NextFeed;
use crate::sensors::{FoodLevel, SensorSnapshot};

pub const COLS: usize = 16;
pub const ROWS: usize = 2;

pub type Line = String<COLS>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayFrame {
    pub line1: Line,
    pub line2: Line,
}

impl DisplayFrame {
    pub fn lines(&self) -> [&str; ROWS] {
        [self.line1.as_str(), self.line2.as_str()]
    }
}

/// Build the frame for the current state.
pub fn render(
    state: &SystemState,
    sensors: &SensorSnapshot,
    wall: Option<&WallClock>,
    next: Option<&NextFeed>,
) -> DisplayFrame {
    let mut scratch: String<32> = String::new();

    // Line 1: clock, backend link, container level.
    match wall {
        _ if state.dispensing => {
            let _ = scratch.push_str("Dispensing...");
        }
        Some(now) if state.rtc_ready => {
            let level = match sensors.food_level {
                FoodLevel::Full => "FULL",
                FoodLevel::Half => "HALF",
                FoodLevel::Empty => "EMPTY",
            };
            let link = if state.backend_connected { '*' } else { 'X' };
            let _ = write!(
                scratch,
                "{:02}:{:02}:{:02} {} {}",
                now.hour, now.minute, now.second, link, level
            );
        }
        _ => {
            let _ = scratch.push_str("Pet Feeder Ready");
        }
    }
    let line1 = fit(&scratch);

    // Line 2: mode or bowl weight with the next feed.
    scratch.clear();
    if state.refill_mode {
        let _ = scratch.push_str("REFILLING...");
    } else if state.dispensing {
        let _ = scratch.push_str("Please wait...");
    } else {
        match next {
            Some(next) if state.rtc_ready => {
                let _ = write!(scratch, "{}g Next:{}", weight_text(sensors.weight_grams), next);
            }
            _ => {
                let _ = write!(scratch, "Bowl:{}g", weight_text(sensors.weight_grams));
            }
        }
    }
    let line2 = fit(&scratch);

    DisplayFrame { line1, line2 }
}

/// Bowl weight in exactly four columns: one decimal while it fits, whole
/// grams above that.
fn weight_text(grams: f32) -> String<4> {
    let mut out = String::new();
    if (-9.95..99.95).contains(&grams) {
        let _ = write!(out, "{:4.1}", grams);
    } else {
        let _ = write!(out, "{:4.0}", grams.clamp(-999.0, 9999.0));
    }
    out
}

/// Truncate or pad to exactly [`COLS`] characters.
fn fit(text: &str) -> Line {
    let mut line = Line::new();
    for c in text.chars().take(COLS) {
        if line.push(c).is_err() {
            break;
        }
    }
    while line.len() < COLS {
        if line.push(' ').is_err() {
            break;
        }
    }
    line
}
