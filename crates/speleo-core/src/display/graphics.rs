//! Glyph grid on top of an RGB565 `embedded-graphics` target.
//!
//! Each cell is 20 × 30 pixels, so the 16 × 8 grid fills a 320 × 240 panel.
//! Double-size glyphs are drawn through [`Scaled2x`], which blows every
//! pixel of the normal font up to a 2 × 2 block.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::iso_8859_1::FONT_10X20;
use embedded_graphics::pixelcolor::{Rgb565, WebColors};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};
use embedded_hal::digital::OutputPin;
use log::warn;

use super::{COLUMNS, DEGREE_GLYPH, GlyphDisplay, ROWS, TextStyle};

pub const CELL_WIDTH_PX: u32 = 20;
pub const CELL_HEIGHT_PX: u32 = 30;
pub const PANEL_WIDTH_PX: u32 = CELL_WIDTH_PX * COLUMNS as u32;
pub const PANEL_HEIGHT_PX: u32 = CELL_HEIGHT_PX * ROWS as u32;

/// Font glyph offset inside a cell.
const GLYPH_INSET: Point = Point::new(5, 5);
/// Bitmap pixels are drawn as `BITMAP_SCALE` × `BITMAP_SCALE` blocks.
const BITMAP_SCALE: u32 = 2;

const FOREGROUND: Rgb565 = Rgb565::WHITE;
const FOREGROUND_LIGHT: Rgb565 = Rgb565::CSS_DIM_GRAY;
const BACKGROUND: Rgb565 = Rgb565::BLACK;

/// Draw target adapter that doubles every pixel around `origin`.
pub struct Scaled2x<'a, D> {
    inner: &'a mut D,
    origin: Point,
}

impl<'a, D> Scaled2x<'a, D> {
    pub fn new(inner: &'a mut D, origin: Point) -> Self {
        Self { inner, origin }
    }
}

impl<D: DrawTarget> OriginDimensions for Scaled2x<'_, D> {
    fn size(&self) -> Size {
        let inner = self.inner.bounding_box().size;
        Size::new(inner.width / 2, inner.height / 2)
    }
}

impl<D: DrawTarget> DrawTarget for Scaled2x<'_, D> {
    type Color = D::Color;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let block = Rectangle::new(
                self.origin + Point::new(point.x * 2, point.y * 2),
                Size::new(2, 2),
            );
            self.inner.fill_solid(&block, color)?;
        }
        Ok(())
    }
}

/// [`GlyphDisplay`] rendering onto a colour panel with a switchable
/// backlight.
pub struct GraphicsDisplay<D, BL> {
    target: D,
    backlight: BL,
    enabled: bool,
}

impl<D, BL> GraphicsDisplay<D, BL>
where
    D: DrawTarget<Color = Rgb565>,
    BL: OutputPin,
{
    pub fn new(target: D, backlight: BL) -> Self {
        Self {
            target,
            backlight,
            enabled: false,
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    /// The underlying target, e.g. to flush a framebuffer.
    pub fn target_mut(&mut self) -> &mut D {
        &mut self.target
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn cell_origin(col: u8, row: u8) -> Point {
        Point::new(
            i32::from(col) * CELL_WIDTH_PX as i32,
            i32::from(row) * CELL_HEIGHT_PX as i32,
        )
    }

    fn colors(style: TextStyle) -> (Rgb565, Rgb565) {
        let fg = if style.light {
            FOREGROUND_LIGHT
        } else {
            FOREGROUND
        };
        if style.inverted {
            (BACKGROUND, fg)
        } else {
            (fg, BACKGROUND)
        }
    }

    fn draw_result<E>(result: Result<(), E>) {
        if result.is_err() {
            warn!("display: draw failed");
        }
    }
}

impl<D, BL> GlyphDisplay for GraphicsDisplay<D, BL>
where
    D: DrawTarget<Color = Rgb565>,
    BL: OutputPin,
{
    fn clear(&mut self) {
        Self::draw_result(self.target.clear(BACKGROUND));
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        let switched = if enabled {
            self.backlight.set_high()
        } else {
            self.backlight.set_low()
        };
        if switched.is_err() {
            warn!("display: backlight switch failed");
        }
    }

    fn write_glyph(&mut self, col: u8, row: u8, ch: char, style: TextStyle) {
        if col >= COLUMNS || row >= ROWS {
            return;
        }
        let (fg, bg) = Self::colors(style);
        let origin = Self::cell_origin(col, row);
        let scale = u32::from(style.advance());
        let cell = Rectangle::new(
            origin,
            Size::new(CELL_WIDTH_PX * scale, CELL_HEIGHT_PX * scale),
        );
        Self::draw_result(self.target.fill_solid(&cell, bg));

        let ch = if ch == DEGREE_GLYPH { '°' } else { ch };
        let mut buf = [0u8; 4];
        let text = ch.encode_utf8(&mut buf);
        let font = MonoTextStyle::new(&FONT_10X20, fg);

        if style.double {
            let mut scaled = Scaled2x::new(&mut self.target, origin);
            Self::draw_result(
                Text::with_baseline(text, GLYPH_INSET, font, Baseline::Top)
                    .draw(&mut scaled)
                    .map(|_| ()),
            );
        } else {
            Self::draw_result(
                Text::with_baseline(text, origin + GLYPH_INSET, font, Baseline::Top)
                    .draw(&mut self.target)
                    .map(|_| ()),
            );
        }
    }

    fn write_bitmap(&mut self, col: u8, row: u8, width: u8, height: u8, data: &[u8]) {
        let origin = Self::cell_origin(col, row);
        let bands = usize::from(height).div_ceil(8);
        for band in 0..bands {
            for x in 0..usize::from(width) {
                let Some(byte) = data.get(band * usize::from(width) + x) else {
                    return;
                };
                for bit in 0..8 {
                    let y = band * 8 + bit;
                    if y >= usize::from(height) {
                        break;
                    }
                    let color = if byte & (1 << bit) != 0 {
                        FOREGROUND
                    } else {
                        BACKGROUND
                    };
                    let block = Rectangle::new(
                        origin
                            + Point::new(
                                (x as u32 * BITMAP_SCALE) as i32,
                                (y as u32 * BITMAP_SCALE) as i32,
                            ),
                        Size::new(BITMAP_SCALE, BITMAP_SCALE),
                    );
                    Self::draw_result(self.target.fill_solid(&block, color));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::battery_icon;
    use crate::framebuffer::PanelBuffer;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Default)]
    struct Backlight {
        on: bool,
    }

    impl ErrorType for Backlight {
        type Error = Infallible;
    }

    impl OutputPin for Backlight {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.on = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.on = true;
            Ok(())
        }
    }

    fn lit_pixels(fb: &PanelBuffer, area: Rectangle) -> usize {
        area.points()
            .filter(|p| fb.pixel(p.x as usize, p.y as usize) == Some(FOREGROUND))
            .count()
    }

    fn display() -> GraphicsDisplay<PanelBuffer, Backlight> {
        GraphicsDisplay::new(PanelBuffer::new(), Backlight::default())
    }

    #[test]
    fn grid_fills_the_panel() {
        assert_eq!(PANEL_WIDTH_PX, 320);
        assert_eq!(PANEL_HEIGHT_PX, 240);
    }

    #[test]
    fn glyph_stays_inside_its_cell() {
        let mut d = display();
        d.write_glyph(1, 1, 'A', TextStyle::NORMAL);
        let fb = d.target();
        let cell = Rectangle::new(Point::new(20, 30), Size::new(20, 30));
        assert!(lit_pixels(fb, cell) > 0);
        let left = Rectangle::new(Point::new(0, 30), Size::new(20, 30));
        assert_eq!(lit_pixels(fb, left), 0);
    }

    #[test]
    fn double_glyph_uses_four_cells() {
        let mut normal = display();
        normal.write_glyph(0, 0, '8', TextStyle::NORMAL);
        let mut double = display();
        double.write_glyph(0, 0, '8', TextStyle::DOUBLE);

        let single = lit_pixels(
            normal.target(),
            Rectangle::new(Point::zero(), Size::new(20, 30)),
        );
        let block = Rectangle::new(Point::zero(), Size::new(40, 60));
        assert_eq!(lit_pixels(double.target(), block), single * 4);
    }

    #[test]
    fn light_style_is_not_full_brightness() {
        let mut d = display();
        d.write_glyph(0, 0, '8', TextStyle::NORMAL.light());
        let cell = Rectangle::new(Point::zero(), Size::new(20, 30));
        assert_eq!(lit_pixels(d.target(), cell), 0);
        assert!(
            cell.points()
                .any(|p| d.target().pixel(p.x as usize, p.y as usize) == Some(FOREGROUND_LIGHT))
        );
    }

    #[test]
    fn bitmap_is_scaled_page_layout() {
        let mut d = display();
        d.write_bitmap(0, 0, 13, 8, &battery_icon(100));
        let fb = d.target();
        // Tip column 0x18: bits 3 and 4 set.
        assert_eq!(fb.pixel(0, 4), Some(BACKGROUND));
        assert_eq!(fb.pixel(0, 6), Some(FOREGROUND));
        assert_eq!(fb.pixel(1, 9), Some(FOREGROUND));
        assert_eq!(fb.pixel(0, 10), Some(BACKGROUND));
        // Full segment 0x7E: bits 1..=6.
        assert_eq!(fb.pixel(4, 2), Some(FOREGROUND));
        assert_eq!(fb.pixel(4, 13), Some(FOREGROUND));
        assert_eq!(fb.pixel(4, 14), Some(BACKGROUND));
    }

    #[test]
    fn enabling_drives_backlight() {
        let mut d = display();
        d.set_enabled(true);
        assert!(d.backlight.on);
        assert!(d.is_enabled());
        d.set_enabled(false);
        assert!(!d.backlight.on);
    }
}
