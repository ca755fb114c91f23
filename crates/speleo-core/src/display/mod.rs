//! Glyph display abstraction
//!
//! The monitor renders onto a 16 × 8 grid of character cells. Cells are
//! addressed by column and row; a double-size glyph covers a 2 × 2 block
//! whose top-left cell is the one addressed. Small monochrome bitmaps use the
//! SSD1306 page layout (one byte = eight vertical pixels, LSB on top).
//!
//! Two implementations live here: [`TextFrame`], an in-memory grid used by
//! tests and the simulator, and [`GraphicsDisplay`], which draws onto any
//! `embedded-graphics` RGB565 target.

mod battery;
mod frame;
mod graphics;

pub use battery::{BATTERY_ICON_WIDTH, BatteryGauge, battery_icon};
pub use frame::{CONTINUATION, TextFrame};
pub use graphics::{CELL_HEIGHT_PX, CELL_WIDTH_PX, GraphicsDisplay, PANEL_HEIGHT_PX, PANEL_WIDTH_PX};

use core::fmt::{self, Write};

use heapless::String;
use log::warn;

/// Number of character columns.
pub const COLUMNS: u8 = 16;
/// Number of character rows.
pub const ROWS: u8 = 8;

/// Character rendered as a degree sign.
pub const DEGREE_GLYPH: char = '[';

/// Rendering attributes of one glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    /// Two columns wide and two rows tall.
    pub double: bool,
    /// Dimmed, used for provisional values.
    pub light: bool,
    /// Swapped foreground and background, used for the value being edited.
    pub inverted: bool,
}

impl TextStyle {
    pub const NORMAL: Self = Self {
        double: false,
        light: false,
        inverted: false,
    };

    pub const DOUBLE: Self = Self {
        double: true,
        light: false,
        inverted: false,
    };

    pub const fn light(self) -> Self {
        Self {
            light: true,
            ..self
        }
    }

    pub const fn inverted(self) -> Self {
        Self {
            inverted: true,
            ..self
        }
    }

    /// Columns consumed by one glyph.
    pub const fn advance(&self) -> u8 {
        if self.double { 2 } else { 1 }
    }
}

/// Digit set used by [`NumberFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Decimal,
    /// Uppercase hexadecimal.
    Hex,
}

/// How [`GlyphDisplay::write_int`] formats a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub radix: Radix,
    /// Minimum number of characters; shorter numbers are left-padded.
    pub width: u8,
    /// Pad with `0` instead of spaces.
    pub zero_fill: bool,
}

impl NumberFormat {
    pub const DECIMAL: Self = Self {
        radix: Radix::Decimal,
        width: 0,
        zero_fill: false,
    };

    pub const HEX: Self = Self {
        radix: Radix::Hex,
        width: 0,
        zero_fill: false,
    };

    pub const fn width(self, width: u8) -> Self {
        Self { width, ..self }
    }

    pub const fn zero_filled(self) -> Self {
        Self {
            zero_fill: true,
            ..self
        }
    }
}

/// Room for any `i64` in decimal with its sign, plus some padding.
const NUMBER_CAPACITY: usize = 24;

/// Formats `value` the way the display shows it: a leading `-` for
/// negatives, left padding up to `format.width`. Fails if the padded text
/// does not fit.
pub fn format_number(
    value: i64,
    format: NumberFormat,
) -> Result<String<NUMBER_CAPACITY>, fmt::Error> {
    let mut digits: String<NUMBER_CAPACITY> = String::new();
    match format.radix {
        Radix::Decimal => write!(digits, "{}", value.unsigned_abs())?,
        Radix::Hex => write!(digits, "{:X}", value.unsigned_abs())?,
    }
    let sign = if value < 0 { "-" } else { "" };
    let width = usize::from(format.width);

    let mut out = String::new();
    if format.zero_fill {
        let width = width.saturating_sub(sign.len());
        write!(out, "{}{:0>width$}", sign, digits.as_str())?;
    } else {
        let pad = width.saturating_sub(sign.len() + digits.len());
        write!(out, "{:pad$}{}{}", "", sign, digits.as_str())?;
    }
    Ok(out)
}

/// A cell-addressed monochrome display.
pub trait GlyphDisplay {
    /// Blank every cell.
    fn clear(&mut self);

    /// Switch the panel on or off. Contents are retained while off.
    fn set_enabled(&mut self, enabled: bool);

    /// Draw one glyph. Writes outside the grid are ignored.
    fn write_glyph(&mut self, col: u8, row: u8, ch: char, style: TextStyle);

    /// Draw a `width` × `height` pixel bitmap whose top-left corner sits on
    /// the given cell. `data` is in page order: `width` bytes per 8-pixel
    /// band, top band first.
    fn write_bitmap(&mut self, col: u8, row: u8, width: u8, height: u8, data: &[u8]);

    /// Draw a string starting at the given cell. Returns the column after the
    /// last glyph.
    fn write_str(&mut self, col: u8, row: u8, text: &str, style: TextStyle) -> u8 {
        let mut col = col;
        for ch in text.chars() {
            self.write_glyph(col, row, ch, style);
            col = col.saturating_add(style.advance());
        }
        col
    }

    /// Draw a formatted integer. Returns the column after the last glyph.
    fn write_int(
        &mut self,
        col: u8,
        row: u8,
        value: i64,
        format: NumberFormat,
        style: TextStyle,
    ) -> u8 {
        match format_number(value, format) {
            Ok(text) => self.write_str(col, row, &text, style),
            Err(_) => {
                warn!("display: {} does not fit {:?}", value, format);
                col
            }
        }
    }
}

impl<T: GlyphDisplay + ?Sized> GlyphDisplay for &mut T {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn set_enabled(&mut self, enabled: bool) {
        (**self).set_enabled(enabled)
    }

    fn write_glyph(&mut self, col: u8, row: u8, ch: char, style: TextStyle) {
        (**self).write_glyph(col, row, ch, style)
    }

    fn write_bitmap(&mut self, col: u8, row: u8, width: u8, height: u8, data: &[u8]) {
        (**self).write_bitmap(col, row, width, height, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_formatting() {
        assert_eq!(format_number(0, NumberFormat::DECIMAL).unwrap().as_str(), "0");
        assert_eq!(format_number(1234, NumberFormat::DECIMAL).unwrap().as_str(), "1234");
        assert_eq!(format_number(-80, NumberFormat::DECIMAL).unwrap().as_str(), "-80");
        assert_eq!(
            format_number(7, NumberFormat::DECIMAL.width(2)).unwrap().as_str(),
            " 7"
        );
        assert_eq!(
            format_number(5, NumberFormat::DECIMAL.width(2).zero_filled()).unwrap().as_str(),
            "05"
        );
        assert_eq!(
            format_number(123456, NumberFormat::DECIMAL.width(2)).unwrap().as_str(),
            "123456"
        );
    }

    #[test]
    fn hex_formatting_is_uppercase() {
        assert_eq!(format_number(0xBEEF, NumberFormat::HEX).unwrap().as_str(), "BEEF");
        assert_eq!(
            format_number(0x0A, NumberFormat::HEX.width(4).zero_filled()).unwrap().as_str(),
            "000A"
        );
    }

    #[test]
    fn extreme_values_fit() {
        assert_eq!(
            format_number(i64::MIN, NumberFormat::DECIMAL).unwrap().as_str(),
            "-9223372036854775808"
        );
        assert_eq!(
            format_number(-0x1F, NumberFormat::HEX.width(4).zero_filled()).unwrap().as_str(),
            "-01F"
        );
        assert_eq!(
            format_number(-7, NumberFormat::DECIMAL.width(4)).unwrap().as_str(),
            "  -7"
        );
    }

    #[test]
    fn oversized_padding_is_an_error_and_draws_nothing() {
        let wide = NumberFormat::DECIMAL.width(40);
        assert_eq!(format_number(1, wide), Err(fmt::Error));

        let mut frame = TextFrame::new();
        assert_eq!(frame.write_int(3, 1, 1, wide, TextStyle::NORMAL), 3);
        assert!(frame.row_text(1).trim().is_empty());
    }

    #[test]
    fn write_helpers_advance_columns() {
        let mut frame = TextFrame::new();
        assert_eq!(frame.write_str(1, 0, "ABC", TextStyle::NORMAL), 4);
        assert_eq!(frame.write_str(0, 2, "12", TextStyle::DOUBLE), 4);
        assert_eq!(
            frame.write_int(9, 5, 1500, NumberFormat::DECIMAL, TextStyle::NORMAL),
            13
        );
        assert_eq!(frame.row_text(5).trim_end(), "         1500");
    }
}
