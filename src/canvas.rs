//! Canvas abstraction the renderer draws against.
//!
//! Anything that can clear, set pixels, draw lines and bitmaps, and push
//! the result to the physical display can show the clock: the in-memory
//! [`Frame`](crate::frame::Frame), the HT16K33 matrix driver, or a test
//! double.

use crate::glyphs::Glyph;

pub trait Canvas {
    type Error: std::fmt::Debug;

    fn clear(&mut self) -> Result<(), Self::Error>;

    fn draw_pixel(&mut self, x: i32, y: i32, on: bool) -> Result<(), Self::Error>;

    /// Straight line between two points, both ends inclusive.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, on: bool)
        -> Result<(), Self::Error>;

    /// Draw the lit pixels of `glyph` with its top-left corner at (`x`, `y`).
    /// Unlit glyph pixels leave the canvas untouched.
    fn draw_bitmap(&mut self, x: i32, y: i32, glyph: &Glyph, on: bool) -> Result<(), Self::Error>;

    /// Push everything drawn since the last flush to the display.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// One canvas operation, as produced by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCommand {
    Clear,
    Pixel {
        x: i32,
        y: i32,
        on: bool,
    },
    Line {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        on: bool,
    },
    Bitmap {
        x: i32,
        y: i32,
        glyph: Glyph,
        on: bool,
    },
    Flush,
}

/// Replay `commands` onto `canvas` in order, stopping at the first error.
pub fn draw<C: Canvas>(canvas: &mut C, commands: &[DrawCommand]) -> Result<(), C::Error> {
    for command in commands {
        match *command {
            DrawCommand::Clear => canvas.clear()?,
            DrawCommand::Pixel { x, y, on } => canvas.draw_pixel(x, y, on)?,
            DrawCommand::Line { x0, y0, x1, y1, on } => canvas.draw_line(x0, y0, x1, y1, on)?,
            DrawCommand::Bitmap { x, y, glyph, on } => canvas.draw_bitmap(x, y, &glyph, on)?,
            DrawCommand::Flush => canvas.flush()?,
        }
    }
    Ok(())
}
