//! # 16×8 Frame Buffer
//!
//! In-memory monochrome frame matching the LED matrix resolution. Each row
//! is a `u16` with bit `x` holding column `x`. The frame is an
//! embedded-graphics [`DrawTarget`], so lines and pixels go through the
//! same primitives any other embedded-graphics display would use, and it is
//! itself [`Drawable`] onto any larger binary display.

use crate::canvas::Canvas;
use crate::glyphs::Glyph;
use core::convert::Infallible;
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
};

/// Matrix width in pixels
pub const WIDTH: u32 = 16;
/// Matrix height in pixels
pub const HEIGHT: u32 = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    rows: [u16; HEIGHT as usize],
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[u16; HEIGHT as usize] {
        &self.rows
    }

    pub fn is_lit(&self, x: u32, y: u32) -> bool {
        x < WIDTH && y < HEIGHT && self.rows[y as usize] & (1 << x) != 0
    }

    pub fn lit_count(&self) -> u32 {
        self.rows.iter().map(|row| row.count_ones()).sum()
    }

    fn set(&mut self, x: i32, y: i32, on: bool) {
        if x < 0 || y < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return;
        }
        let mask = 1u16 << x;
        if on {
            self.rows[y as usize] |= mask;
        } else {
            self.rows[y as usize] &= !mask;
        }
    }

    /// Render as text, `#` for lit and `.` for dark pixels.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(((WIDTH + 1) * HEIGHT) as usize);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                out.push(if self.is_lit(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

fn color(on: bool) -> BinaryColor {
    if on {
        BinaryColor::On
    } else {
        BinaryColor::Off
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point.x, point.y, color.is_on());
        }
        Ok(())
    }
}

impl Drawable for Frame {
    type Color = BinaryColor;
    type Output = ();

    fn draw<D>(&self, target: &mut D) -> Result<Self::Output, D::Error>
    where
        D: DrawTarget<Color = Self::Color>,
    {
        target.draw_iter((0..HEIGHT).flat_map(|y| {
            (0..WIDTH).map(move |x| {
                Pixel(
                    Point::new(x as i32, y as i32),
                    color(self.is_lit(x, y)),
                )
            })
        }))
    }
}

impl Canvas for Frame {
    type Error = Infallible;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.rows = [0; HEIGHT as usize];
        Ok(())
    }

    fn draw_pixel(&mut self, x: i32, y: i32, on: bool) -> Result<(), Self::Error> {
        Pixel(Point::new(x, y), color(on)).draw(self)
    }

    fn draw_line(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        on: bool,
    ) -> Result<(), Self::Error> {
        Line::new(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(PrimitiveStyle::with_stroke(color(on), 1))
            .draw(self)
    }

    fn draw_bitmap(&mut self, x: i32, y: i32, glyph: &Glyph, on: bool) -> Result<(), Self::Error> {
        let lit = (0..glyph.height).flat_map(|gy| {
            (0..glyph.width)
                .filter(move |&gx| glyph.is_set(gx, gy))
                .map(move |gx| Pixel(Point::new(x + gx as i32, y + gy as i32), color(on)))
        });
        self.draw_iter(lit)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
