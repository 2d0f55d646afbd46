//! # Clock Face Rendering
//!
//! Turns a local instant into the draw commands for one 16×8 frame. The
//! layout, left to right:
//!
//! ```text
//!  x: 0   4     9   13
//!     H   H  :  M   M      digits, 3×5 each, band at y=2 (AM) or y=1 (PM)
//!     ####### .. #######   AM/PM bar at y=0 (AM) or y=7 (PM)
//! ```
//!
//! Columns 7 and 8 are never drawn in the bar; they separate hours from
//! minutes. One bar pixel is switched off to show seconds: it sweeps across
//! ten positions and wraps every ten seconds.
//!
//! Rendering is pure. Every frame starts with a clear and ends with a
//! flush, so nothing carries over between frames.

use crate::canvas::DrawCommand;
use crate::glyphs::{self, Icon};

const SECONDS_PER_DAY: i64 = 86_400;

/// Left edge of each digit slot: hour tens, hour units, minute tens, minute units
const DIGIT_X: [i32; 4] = [0, 4, 9, 13];

/// Left edge of the 8×8 status icons
const ICON_X: i32 = 4;

/// Wall-clock components of a local instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeParts {
    /// 1-12
    pub hour12: u8,
    pub minute: u8,
    pub second: u8,
    pub is_pm: bool,
}

impl TimeParts {
    pub fn from_local(local: i64) -> Self {
        let secs_of_day = local.rem_euclid(SECONDS_PER_DAY);
        let hour24 = (secs_of_day / 3600) as u8;
        let minute = ((secs_of_day / 60) % 60) as u8;
        let second = (secs_of_day % 60) as u8;
        let hour12 = match hour24 % 12 {
            0 => 12,
            h => h,
        };
        Self {
            hour12,
            minute,
            second,
            is_pm: hour24 >= 12,
        }
    }

    /// "HHMM" as four decimal digits, zero-padded.
    pub fn digits(&self) -> [u8; 4] {
        [
            self.hour12 / 10,
            self.hour12 % 10,
            self.minute / 10,
            self.minute % 10,
        ]
    }

    /// Top row of the digit band.
    pub fn digit_row(&self) -> i32 {
        if self.is_pm {
            1
        } else {
            2
        }
    }

    /// Row of the AM/PM bar.
    pub fn indicator_row(&self) -> i32 {
        if self.is_pm {
            7
        } else {
            0
        }
    }
}

/// Bar column switched off for `second`. Buckets 5-9 skip the two-column
/// gap, so the result is always in 1..=5 or 10..=14.
pub fn blink_column(second: u8) -> i32 {
    let bucket = i32::from(second % 10);
    bucket + if bucket > 4 { 5 } else { 1 }
}

/// Draw commands for one clock frame.
pub fn render(local: i64) -> Vec<DrawCommand> {
    let parts = TimeParts::from_local(local);
    let bar_y = parts.indicator_row();
    let digit_y = parts.digit_row();

    let mut commands = Vec::with_capacity(9);
    commands.push(DrawCommand::Clear);

    // AM/PM bar with the seconds gap punched into it
    commands.push(DrawCommand::Line {
        x0: 0,
        y0: bar_y,
        x1: 6,
        y1: bar_y,
        on: true,
    });
    commands.push(DrawCommand::Line {
        x0: 9,
        y0: bar_y,
        x1: 15,
        y1: bar_y,
        on: true,
    });
    commands.push(DrawCommand::Pixel {
        x: blink_column(parts.second),
        y: bar_y,
        on: false,
    });

    for (slot, (&x, value)) in DIGIT_X.iter().zip(parts.digits()).enumerate() {
        // No leading zero on the hour
        if slot == 0 && value == 0 {
            continue;
        }
        if let Some(glyph) = glyphs::digit(value) {
            commands.push(DrawCommand::Bitmap {
                x,
                y: digit_y,
                glyph,
                on: true,
            });
        }
    }

    commands.push(DrawCommand::Flush);
    commands
}

/// Draw commands for a full-frame connectivity icon.
pub fn render_icon(kind: Icon) -> Vec<DrawCommand> {
    vec![
        DrawCommand::Clear,
        DrawCommand::Bitmap {
            x: ICON_X,
            y: 0,
            glyph: glyphs::icon(kind),
            on: true,
        },
        DrawCommand::Flush,
    ]
}

/// Print a frame to stdout for development without hardware.
pub fn draw_ascii(frame: &crate::frame::Frame) {
    println!("+{}+", "-".repeat(crate::frame::WIDTH as usize));
    for line in frame.to_ascii().lines() {
        println!("|{}|", line);
    }
    println!("+{}+", "-".repeat(crate::frame::WIDTH as usize));
}
