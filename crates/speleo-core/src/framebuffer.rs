//! RAM framebuffer with dirty-region tracking.
//!
//! The glyph renderer draws into this buffer; the firmware then pushes only
//! the bounding box of changed pixels to the panel in one transfer. A
//! measuring tick typically touches a handful of cells, so a flush is a small
//! fraction of the full screen.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

use crate::display::{PANEL_HEIGHT_PX, PANEL_WIDTH_PX};

/// Framebuffer matching the glyph grid of the monitor.
pub type PanelBuffer = FrameBuffer<{ PANEL_WIDTH_PX as usize }, { PANEL_HEIGHT_PX as usize }>;

/// Inclusive bounds of changed pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    left: usize,
    top: usize,
    right: usize,
    bottom: usize,
}

impl Region {
    fn point(x: usize, y: usize) -> Self {
        Self {
            left: x,
            top: y,
            right: x,
            bottom: y,
        }
    }

    fn include(&mut self, x: usize, y: usize) {
        self.left = self.left.min(x);
        self.top = self.top.min(y);
        self.right = self.right.max(x);
        self.bottom = self.bottom.max(y);
    }

    fn width(&self) -> usize {
        self.right - self.left + 1
    }

    fn height(&self) -> usize {
        self.bottom - self.top + 1
    }
}

/// `W` × `H` RGB565 pixels on the heap.
pub struct FrameBuffer<const W: usize, const H: usize> {
    pixels: Vec<Rgb565>,
    dirty: Option<Region>,
}

impl<const W: usize, const H: usize> Default for FrameBuffer<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize, const H: usize> FrameBuffer<W, H> {
    /// All black, nothing dirty (a freshly initialised panel is black too).
    pub fn new() -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; W * H],
            dirty: None,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb565> {
        if x < W && y < H {
            self.pixels.get(y * W + x).copied()
        } else {
            None
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Mark the whole buffer for the next flush, e.g. after the panel lost
    /// its contents during sleep.
    pub fn invalidate(&mut self) {
        self.dirty = Some(Region {
            left: 0,
            top: 0,
            right: W - 1,
            bottom: H - 1,
        });
    }

    fn store(&mut self, x: usize, y: usize, color: Rgb565) {
        if x >= W || y >= H {
            return;
        }
        let slot = &mut self.pixels[y * W + x];
        if *slot == color {
            return;
        }
        *slot = color;
        match self.dirty.as_mut() {
            Some(region) => region.include(x, y),
            None => self.dirty = Some(Region::point(x, y)),
        }
    }

    /// Send the changed region to `panel` and mark everything clean. Does
    /// nothing when no pixel changed since the last flush.
    pub fn flush<P>(&mut self, panel: &mut P) -> Result<(), P::Error>
    where
        P: DrawTarget<Color = Rgb565>,
    {
        let Some(region) = self.dirty else {
            return Ok(());
        };
        debug!(
            "framebuffer: flushing {}x{} at ({}, {})",
            region.width(),
            region.height(),
            region.left,
            region.top
        );

        let area = Rectangle::new(
            Point::new(region.left as i32, region.top as i32),
            Size::new(region.width() as u32, region.height() as u32),
        );
        let pixels = &self.pixels;
        let colors = (region.top..=region.bottom).flat_map(move |y| {
            let start = y * W + region.left;
            pixels[start..start + region.width()].iter().copied()
        });
        panel.fill_contiguous(&area, colors)?;
        self.dirty = None;
        Ok(())
    }
}

impl<const W: usize, const H: usize> OriginDimensions for FrameBuffer<W, H> {
    fn size(&self) -> Size {
        Size::new(W as u32, H as u32)
    }
}

impl<const W: usize, const H: usize> DrawTarget for FrameBuffer<W, H> {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) {
                self.store(x, y, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let clipped = area.intersection(&self.bounding_box());
        let Some(bottom_right) = clipped.bottom_right() else {
            return Ok(());
        };
        for y in clipped.top_left.y..=bottom_right.y {
            for x in clipped.top_left.x..=bottom_right.x {
                self.store(x as usize, y as usize, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// Panel stand-in that records every flushed area.
    #[derive(Default)]
    struct Panel {
        flushes: Vec<(Rectangle, usize)>,
    }

    impl OriginDimensions for Panel {
        fn size(&self) -> Size {
            Size::new(8, 8)
        }
    }

    impl DrawTarget for Panel {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            Ok(())
        }

        fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Self::Color>,
        {
            self.flushes.push((*area, colors.into_iter().count()));
            Ok(())
        }
    }

    #[test]
    fn unchanged_pixels_do_not_dirty() {
        let mut fb = FrameBuffer::<8, 8>::new();
        fb.fill_solid(&Rectangle::new(Point::zero(), Size::new(8, 8)), Rgb565::BLACK)
            .unwrap();
        assert!(!fb.is_dirty());
    }

    #[test]
    fn flush_sends_bounding_box_once() {
        let mut fb = FrameBuffer::<8, 8>::new();
        let mut panel = Panel::default();
        Pixel(Point::new(1, 2), Rgb565::WHITE).draw(&mut fb).unwrap();
        Pixel(Point::new(4, 3), Rgb565::RED).draw(&mut fb).unwrap();

        fb.flush(&mut panel).unwrap();
        fb.flush(&mut panel).unwrap();

        assert_eq!(panel.flushes.len(), 1);
        let (area, count) = panel.flushes[0];
        assert_eq!(area, Rectangle::new(Point::new(1, 2), Size::new(4, 2)));
        assert_eq!(count, 8);
        assert!(!fb.is_dirty());
    }

    #[test]
    fn out_of_bounds_drawing_is_clipped() {
        let mut fb = FrameBuffer::<8, 8>::new();
        fb.fill_solid(&Rectangle::new(Point::new(6, -3), Size::new(10, 5)), Rgb565::WHITE)
            .unwrap();
        Pixel(Point::new(-1, 0), Rgb565::WHITE).draw(&mut fb).unwrap();
        assert_eq!(fb.pixel(6, 0), Some(Rgb565::WHITE));
        assert_eq!(fb.pixel(7, 1), Some(Rgb565::WHITE));
        assert_eq!(fb.pixel(7, 2), Some(Rgb565::BLACK));
        assert_eq!(fb.pixel(8, 0), None);
    }

    #[test]
    fn invalidate_forces_full_flush() {
        let mut fb = FrameBuffer::<8, 8>::new();
        let mut panel = Panel::default();
        fb.invalidate();
        fb.flush(&mut panel).unwrap();
        assert_eq!(panel.flushes[0].1, 64);
    }
}
