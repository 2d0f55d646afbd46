//! # Glyph Table
//!
//! Bitmaps for the ten digits (3×5 pixels) and the two connectivity icons
//! (8×8 pixels). Each row is one byte, most significant bit = leftmost
//! pixel, so a 3-pixel wide row only uses the top three bits.

/// Digit glyph width in pixels
pub const DIGIT_WIDTH: u32 = 3;
/// Digit glyph height in pixels
pub const DIGIT_HEIGHT: u32 = 5;
/// Icon glyph edge length in pixels
pub const ICON_SIZE: u32 = 8;

/// A fixed monochrome bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    /// One byte per row, MSB first
    pub rows: &'static [u8],
}

impl Glyph {
    /// Whether the pixel at (`x`, `y`) inside the glyph is lit.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.rows[y as usize] & (0x80 >> x) != 0
    }
}

/// Connectivity status icons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Icon {
    Disconnected,
    Connected,
}

static DIGITS: [[u8; 5]; 10] = [
    [0b1110_0000, 0b1010_0000, 0b1010_0000, 0b1010_0000, 0b1110_0000], // 0
    [0b0100_0000, 0b0100_0000, 0b0100_0000, 0b0100_0000, 0b0100_0000], // 1
    [0b1110_0000, 0b0010_0000, 0b1110_0000, 0b1000_0000, 0b1110_0000], // 2
    [0b1110_0000, 0b0010_0000, 0b1110_0000, 0b0010_0000, 0b1110_0000], // 3
    [0b1010_0000, 0b1010_0000, 0b1110_0000, 0b0010_0000, 0b0010_0000], // 4
    [0b1110_0000, 0b1000_0000, 0b1110_0000, 0b0010_0000, 0b1110_0000], // 5
    [0b1110_0000, 0b1000_0000, 0b1110_0000, 0b1010_0000, 0b1110_0000], // 6
    [0b1110_0000, 0b0010_0000, 0b0010_0000, 0b0010_0000, 0b0010_0000], // 7
    [0b1110_0000, 0b1010_0000, 0b1110_0000, 0b1010_0000, 0b1110_0000], // 8
    [0b1110_0000, 0b1010_0000, 0b1110_0000, 0b0010_0000, 0b1110_0000], // 9
];

static DISCONNECTED: [u8; 8] = [
    0b0000_0000,
    0b0000_0000,
    0b0010_0100,
    0b1110_0111,
    0b0010_0100,
    0b0000_0000,
    0b0000_0000,
    0b0000_0000,
];

static CONNECTED: [u8; 8] = [
    0b0000_0000,
    0b0000_0000,
    0b0001_1000,
    0b1111_1111,
    0b0001_1000,
    0b0000_0000,
    0b0000_0000,
    0b0000_0000,
];

/// Glyph for a single decimal digit, `None` above 9.
pub fn digit(value: u8) -> Option<Glyph> {
    DIGITS.get(value as usize).map(|rows| Glyph {
        width: DIGIT_WIDTH,
        height: DIGIT_HEIGHT,
        rows,
    })
}

pub fn icon(kind: Icon) -> Glyph {
    let rows: &'static [u8] = match kind {
        Icon::Disconnected => &DISCONNECTED,
        Icon::Connected => &CONNECTED,
    };
    Glyph {
        width: ICON_SIZE,
        height: ICON_SIZE,
        rows,
    }
}
