use alloc::string::String;
use alloc::vec::Vec;

use super::{COLUMNS, GlyphDisplay, ROWS, TextStyle};

/// Marker stored in the cells covered by the right and lower halves of a
/// double-size glyph.
pub const CONTINUATION: char = '\0';

const BLANK: Cell = Cell {
    ch: ' ',
    style: TextStyle::NORMAL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bitmap {
    col: u8,
    row: u8,
    data: Vec<u8>,
}

/// In-memory character grid.
///
/// Keeps exactly what a glyph panel would show, so tests and the simulator
/// can inspect the screen as text.
#[derive(Debug, Clone)]
pub struct TextFrame {
    cells: [[Cell; COLUMNS as usize]; ROWS as usize],
    bitmaps: Vec<Bitmap>,
    bitmap_writes: usize,
    enabled: bool,
}

impl Default for TextFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFrame {
    pub fn new() -> Self {
        Self {
            cells: [[BLANK; COLUMNS as usize]; ROWS as usize],
            bitmaps: Vec::new(),
            bitmap_writes: 0,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cell(&self, col: u8, row: u8) -> Option<Cell> {
        self.cells
            .get(usize::from(row))
            .and_then(|r| r.get(usize::from(col)))
            .copied()
    }

    /// Visible characters of one row. Continuation cells of double glyphs
    /// are skipped, so a double `42` reads as `42`.
    pub fn row_text(&self, row: u8) -> String {
        self.cells
            .get(usize::from(row))
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| c.ch)
                    .filter(|ch| *ch != CONTINUATION)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `len` cells starting at `col`, continuation cells skipped.
    pub fn text_at(&self, col: u8, row: u8, len: u8) -> String {
        (col..col.saturating_add(len))
            .filter_map(|c| self.cell(c, row))
            .map(|cell| cell.ch)
            .filter(|ch| *ch != CONTINUATION)
            .collect()
    }

    /// Whether any row contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        (0..ROWS).any(|row| self.row_text(row).contains(needle))
    }

    /// The whole screen, one line per row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in 0..ROWS {
            out.push('|');
            out.push_str(&self.row_text(row));
            out.push_str("|\n");
        }
        out
    }

    pub fn bitmap_at(&self, col: u8, row: u8) -> Option<&[u8]> {
        self.bitmaps
            .iter()
            .find(|b| b.col == col && b.row == row)
            .map(|b| b.data.as_slice())
    }

    /// Number of bitmap writes since creation, including repeated ones.
    pub fn bitmap_writes(&self) -> usize {
        self.bitmap_writes
    }

    fn set(&mut self, col: u8, row: u8, cell: Cell) {
        if let Some(slot) = self
            .cells
            .get_mut(usize::from(row))
            .and_then(|r| r.get_mut(usize::from(col)))
        {
            *slot = cell;
        }
    }
}

impl GlyphDisplay for TextFrame {
    fn clear(&mut self) {
        self.cells = [[BLANK; COLUMNS as usize]; ROWS as usize];
        self.bitmaps.clear();
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn write_glyph(&mut self, col: u8, row: u8, ch: char, style: TextStyle) {
        self.set(col, row, Cell { ch, style });
        if style.double {
            let cont = Cell {
                ch: CONTINUATION,
                style,
            };
            self.set(col.saturating_add(1), row, cont);
            self.set(col, row.saturating_add(1), cont);
            self.set(col.saturating_add(1), row.saturating_add(1), cont);
        }
    }

    fn write_bitmap(&mut self, col: u8, row: u8, _width: u8, _height: u8, data: &[u8]) {
        self.bitmap_writes += 1;
        let bitmap = Bitmap {
            col,
            row,
            data: data.to_vec(),
        };
        match self
            .bitmaps
            .iter_mut()
            .find(|b| b.col == col && b.row == row)
        {
            Some(existing) => *existing = bitmap,
            None => self.bitmaps.push(bitmap),
        }
    }
}
