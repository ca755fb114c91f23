//! Battery gauge in the top-left corner of the measuring screen.

use super::{GlyphDisplay, NumberFormat, TextStyle};

/// Width of the icon in pixels; one 8-pixel band tall.
pub const BATTERY_ICON_WIDTH: u8 = 13;

const TIP: u8 = 0x18;
const EDGE: u8 = 0x7E;
const FILLED: u8 = 0x7E;
const EMPTY: u8 = 0x42;
const SEGMENTS: u8 = 10;

/// Column where the percentage label starts (right of the icon).
const LABEL_COL: u8 = 2;
/// Column up to which the label area is blanked.
const LABEL_END_COL: u8 = 6;

/// Icon bitmap for the given charge. The tip is on the left and segments
/// fill from the right; segment `n` is lit when `percent > n × 10`.
pub fn battery_icon(percent: u8) -> [u8; BATTERY_ICON_WIDTH as usize] {
    let mut icon = [EDGE; BATTERY_ICON_WIDTH as usize];
    icon[0] = TIP;
    for segment in 0..SEGMENTS {
        let column = usize::from(SEGMENTS + 1 - segment);
        icon[column] = if percent > segment * 10 { FILLED } else { EMPTY };
    }
    icon
}

/// Draws the icon and `NN%` label, skipping redraws when the value is
/// unchanged.
#[derive(Debug, Default)]
pub struct BatteryGauge {
    shown: Option<u8>,
}

impl BatteryGauge {
    pub const fn new() -> Self {
        Self { shown: None }
    }

    /// Forget what is on screen; the next [`Self::show`] always draws.
    pub fn invalidate(&mut self) {
        self.shown = None;
    }

    pub fn shown(&self) -> Option<u8> {
        self.shown
    }

    pub fn show<D: GlyphDisplay + ?Sized>(&mut self, display: &mut D, percent: u8) {
        if self.shown == Some(percent) {
            return;
        }
        self.shown = Some(percent);

        display.write_bitmap(0, 0, BATTERY_ICON_WIDTH, 8, &battery_icon(percent));
        let mut col = display.write_int(
            LABEL_COL,
            0,
            i64::from(percent),
            NumberFormat::DECIMAL,
            TextStyle::NORMAL,
        );
        display.write_glyph(col, 0, '%', TextStyle::NORMAL);
        col += 1;
        while col < LABEL_END_COL {
            display.write_glyph(col, 0, ' ', TextStyle::NORMAL);
            col += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::TextFrame;

    #[test]
    fn icon_fill_levels() {
        assert_eq!(
            battery_icon(0),
            [0x18, 0x7E, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x7E]
        );
        assert_eq!(
            battery_icon(25),
            [0x18, 0x7E, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x7E, 0x7E, 0x7E, 0x7E]
        );
        assert_eq!(battery_icon(100), [0x18, 0x7E, 0x7E, 0x7E, 0x7E, 0x7E, 0x7E, 0x7E, 0x7E, 0x7E, 0x7E, 0x7E, 0x7E]);
    }

    #[test]
    fn redraws_only_on_change() {
        let mut frame = TextFrame::new();
        let mut gauge = BatteryGauge::new();
        gauge.show(&mut frame, 50);
        gauge.show(&mut frame, 50);
        assert_eq!(frame.bitmap_writes(), 1);
        assert_eq!(frame.text_at(2, 0, 4), "50% ");

        gauge.show(&mut frame, 7);
        assert_eq!(frame.bitmap_writes(), 2);
        assert_eq!(frame.text_at(2, 0, 4), "7%  ");

        gauge.invalidate();
        gauge.show(&mut frame, 7);
        assert_eq!(frame.bitmap_writes(), 3);
    }

    #[test]
    fn full_label_fits_before_column_six() {
        let mut frame = TextFrame::new();
        BatteryGauge::new().show(&mut frame, 100);
        assert_eq!(frame.text_at(2, 0, 4), "100%");
    }
}
