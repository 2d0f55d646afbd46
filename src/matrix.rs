//! # HT16K33 LED Matrix Driver
//!
//! Driver for the 16×8 "mini matrix" LED backpack built around the HT16K33
//! controller, talking over any `embedded-hal` 1.0 I2C bus.
//!
//! ## Display Memory
//!
//! The controller holds eight 16-bit rows. On this backpack each
//! controller row drives one column of an 8×8 half of the panel, and the
//! second byte of a row drives the second half, so the 16×8 image has to
//! be shuffled into place on every flush. The shuffle depends on which way
//! round the panel is mounted; that choice is made once when the driver is
//! created.
//!
//! ## Command Set
//! - `0x21`: system oscillator on
//! - `0x81`: display on, blinking off
//! - `0xE0 | n`: dimming level `n` (0-15)
//! - `0x00, data…`: write display RAM starting at address 0

use crate::canvas::Canvas;
use crate::frame::{Frame, HEIGHT, WIDTH};
use crate::glyphs::Glyph;
use embedded_hal::i2c::I2c;
use thiserror::Error;
use tracing::debug;

const CMD_OSCILLATOR_ON: u8 = 0x21;
const CMD_DISPLAY_ON: u8 = 0x81;
const CMD_BRIGHTNESS: u8 = 0xE0;

/// Highest dimming level the controller accepts
pub const MAX_BRIGHTNESS: u8 = 15;

#[derive(Error, Debug)]
pub enum MatrixError<E: core::fmt::Debug> {
    /// I2C transaction failed
    #[error("I2C bus error: {0:?}")]
    Bus(E),

    #[error("brightness {0} is above 15")]
    Brightness(u8),

    #[error("rotation {0} is not a landscape orientation (1 or 3)")]
    Rotation(u8),
}

/// Landscape mounting of the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    /// Quarter turn clockwise from the backpack's native portrait layout
    Quarter,
    /// Three quarter turns, i.e. `Quarter` upside down
    ThreeQuarter,
}

impl Rotation {
    pub fn from_quarter_turns(turns: u8) -> Option<Self> {
        match turns {
            1 => Some(Rotation::Quarter),
            3 => Some(Rotation::ThreeQuarter),
            _ => None,
        }
    }

    /// Controller row and bit for logical pixel (`x`, `y`).
    fn map(self, x: u32, y: u32) -> (usize, u32) {
        let (column, bit) = match self {
            Rotation::Quarter => (x, HEIGHT - 1 - y),
            Rotation::ThreeQuarter => (WIDTH - 1 - x, y),
        };
        if column >= 8 {
            ((column - 8) as usize, bit + 8)
        } else {
            (column as usize, bit)
        }
    }
}

/// Display RAM write for `frame`: address byte followed by eight
/// little-endian rows.
pub fn encode(frame: &Frame, rotation: Rotation) -> [u8; 17] {
    let mut ram = [0u16; 8];
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if frame.is_lit(x, y) {
                let (row, bit) = rotation.map(x, y);
                ram[row] |= 1 << bit;
            }
        }
    }

    let mut out = [0u8; 17];
    for (i, row) in ram.iter().enumerate() {
        out[1 + 2 * i..3 + 2 * i].copy_from_slice(&row.to_le_bytes());
    }
    out
}

pub struct Ht16k33Matrix<I2C> {
    i2c: I2C,
    address: u8,
    rotation: Rotation,
    frame: Frame,
}

impl<I2C: I2c> Ht16k33Matrix<I2C> {
    /// Wake the controller, switch the display on and set its brightness.
    pub fn new(
        i2c: I2C,
        address: u8,
        rotation: u8,
        brightness: u8,
    ) -> Result<Self, MatrixError<I2C::Error>> {
        let rotation =
            Rotation::from_quarter_turns(rotation).ok_or(MatrixError::Rotation(rotation))?;
        let mut matrix = Self {
            i2c,
            address,
            rotation,
            frame: Frame::new(),
        };
        matrix.command(CMD_OSCILLATOR_ON)?;
        matrix.command(CMD_DISPLAY_ON)?;
        matrix.set_brightness(brightness)?;
        Ok(matrix)
    }

    pub fn set_brightness(&mut self, level: u8) -> Result<(), MatrixError<I2C::Error>> {
        if level > MAX_BRIGHTNESS {
            return Err(MatrixError::Brightness(level));
        }
        self.command(CMD_BRIGHTNESS | level)
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn command(&mut self, byte: u8) -> Result<(), MatrixError<I2C::Error>> {
        self.i2c
            .write(self.address, &[byte])
            .map_err(MatrixError::Bus)
    }
}

impl<I2C: I2c> Canvas for Ht16k33Matrix<I2C> {
    type Error = MatrixError<I2C::Error>;

    fn clear(&mut self) -> Result<(), Self::Error> {
        Canvas::clear(&mut self.frame).map_err(|never| match never {})
    }

    fn draw_pixel(&mut self, x: i32, y: i32, on: bool) -> Result<(), Self::Error> {
        self.frame.draw_pixel(x, y, on).map_err(|never| match never {})
    }

    fn draw_line(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        on: bool,
    ) -> Result<(), Self::Error> {
        self.frame.draw_line(x0, y0, x1, y1, on).map_err(|never| match never {})
    }

    fn draw_bitmap(&mut self, x: i32, y: i32, glyph: &Glyph, on: bool) -> Result<(), Self::Error> {
        self.frame.draw_bitmap(x, y, glyph, on).map_err(|never| match never {})
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let ram = encode(&self.frame, self.rotation);
        debug!(lit = self.frame.lit_count(), "writing display RAM");
        self.i2c.write(self.address, &ram).map_err(MatrixError::Bus)
    }
}
