//! Full-resolution shadow copy of the remote display.
//!
//! All three update kinds clip against the buffer bounds; nothing here
//! ever fails on coordinates.

use crate::mirror::types::{Color, Rect, UpdateEvent};

// ── ShadowFramebuffer ────────────────────────────────────────────

/// Dense row-major `width × height` array of [`Color`].
///
/// Allocated once per remote connection from the announced geometry
/// and never resized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowFramebuffer {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl ShadowFramebuffer {
    /// Create an all-black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            pixels: vec![Color::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// One row of pixels.
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of bounds.
    pub fn row(&self, y: usize) -> &[Color] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    /// The pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Read back the clipped part of a rectangle, row-major.
    pub fn region(&self, x: u32, y: u32, width: u32, height: u32) -> Vec<Color> {
        let Some(rect) = self.clip(x, y, width, height) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(rect.width * rect.height);
        for row in rect.y..rect.y + rect.height {
            let start = row * self.width + rect.x;
            out.extend_from_slice(&self.pixels[start..start + rect.width]);
        }
        out
    }

    /// Apply one update event.
    pub fn apply(&mut self, event: &UpdateEvent) {
        match *event {
            UpdateEvent::Raw {
                x,
                y,
                width,
                height,
                ref pixels,
            } => self.apply_raw(x, y, width, height, pixels),
            UpdateEvent::Copy {
                src_x,
                src_y,
                dst_x,
                dst_y,
                width,
                height,
            } => self.apply_copy(src_x, src_y, dst_x, dst_y, width, height),
            UpdateEvent::Fill {
                x,
                y,
                width,
                height,
                color,
            } => self.apply_fill(x, y, width, height, color),
        }
    }

    /// Write a row-major `width × height` block at `(x, y)`.
    ///
    /// Pixels that land outside the buffer are discarded. If `pixels`
    /// is short, only the rows and columns it covers are written.
    pub fn apply_raw(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[Color]) {
        let Some(rect) = self.clip(x, y, width, height) else {
            return;
        };
        let src_stride = width as usize;

        for row in 0..rect.height {
            let src_start = row * src_stride;
            if src_start >= pixels.len() {
                break;
            }
            let src_end = (src_start + rect.width).min(pixels.len());
            let dst_start = (rect.y + row) * self.width + rect.x;
            let len = src_end - src_start;
            self.pixels[dst_start..dst_start + len].copy_from_slice(&pixels[src_start..src_end]);
        }
    }

    /// Fill the clipped rectangle with `color`.
    pub fn apply_fill(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        let Some(rect) = self.clip(x, y, width, height) else {
            return;
        };
        for row in rect.y..rect.y + rect.height {
            let start = row * self.width + rect.x;
            self.pixels[start..start + rect.width].fill(color);
        }
    }

    /// Copy a block from `(src_x, src_y)` to `(dst_x, dst_y)`.
    ///
    /// Only the part that is in bounds at both ends is copied. The
    /// source is staged into a snapshot first, so overlapping regions
    /// give the same result in every direction.
    pub fn apply_copy(
        &mut self,
        src_x: u32,
        src_y: u32,
        dst_x: u32,
        dst_y: u32,
        width: u32,
        height: u32,
    ) {
        if src_x == dst_x && src_y == dst_y {
            return;
        }
        let Some(src) = self.clip(src_x, src_y, width, height) else {
            return;
        };
        let Some(dst) = self.clip(dst_x, dst_y, src.width as u32, src.height as u32) else {
            return;
        };

        let mut staging = Vec::with_capacity(dst.width * dst.height);
        for row in 0..dst.height {
            let start = (src.y + row) * self.width + src.x;
            staging.extend_from_slice(&self.pixels[start..start + dst.width]);
        }

        for (row, chunk) in staging.chunks_exact(dst.width).enumerate() {
            let start = (dst.y + row) * self.width + dst.x;
            self.pixels[start..start + dst.width].copy_from_slice(chunk);
        }
    }

    fn clip(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Rect> {
        Rect::clip(x, y, width, height, self.width, self.height)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Every pixel gets a distinct colour so copies are traceable.
    fn gradient(w: u32, h: u32) -> ShadowFramebuffer {
        let mut fb = ShadowFramebuffer::new(w, h);
        let pixels: Vec<Color> = (0..w * h)
            .map(|i| Color::new((i % 251) as u8, (i / 251) as u8, 7))
            .collect();
        fb.apply_raw(0, 0, w, h, &pixels);
        fb
    }

    /// Reference copy through a fully materialised snapshot.
    fn snapshot_copy(
        fb: &ShadowFramebuffer,
        sx: u32,
        sy: u32,
        dx: u32,
        dy: u32,
        w: u32,
        h: u32,
    ) -> ShadowFramebuffer {
        let snapshot = fb.clone();
        let mut out = fb.clone();
        for row in 0..h {
            for col in 0..w {
                if let Some(c) = snapshot.pixel(sx + col, sy + row) {
                    if dx + col < fb.width() as u32 && dy + row < fb.height() as u32 {
                        out.apply_fill(dx + col, dy + row, 1, 1, c);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn new_buffer_is_black() {
        let fb = ShadowFramebuffer::new(4, 3);
        assert_eq!(fb.pixels().len(), 12);
        assert!(fb.pixels().iter().all(|&c| c == Color::BLACK));
    }

    #[test]
    fn raw_then_read_back() {
        let mut fb = ShadowFramebuffer::new(16, 16);
        let block: Vec<Color> = (0..12).map(|i| Color::new(i, i * 2, 200)).collect();
        fb.apply_raw(3, 5, 4, 3, &block);
        assert_eq!(fb.region(3, 5, 4, 3), block);
    }

    #[test]
    fn raw_inside_fill_leaves_rest_untouched() {
        let mut fb = ShadowFramebuffer::new(20, 10);
        fb.apply_fill(0, 0, 20, 10, Color::RED);
        fb.apply_raw(5, 2, 3, 3, &[Color::BLUE; 9]);

        for y in 0..10 {
            for x in 0..20 {
                let inside = (5..8).contains(&x) && (2..5).contains(&y);
                let expected = if inside { Color::BLUE } else { Color::RED };
                assert_eq!(fb.pixel(x, y), Some(expected), "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn raw_partially_outside_is_clipped() {
        let mut fb = ShadowFramebuffer::new(4, 4);
        let block: Vec<Color> = (0..9).map(|i| Color::new(i as u8 + 1, 0, 0)).collect();
        fb.apply_raw(2, 2, 3, 3, &block);

        assert_eq!(fb.pixel(2, 2), Some(Color::new(1, 0, 0)));
        assert_eq!(fb.pixel(3, 2), Some(Color::new(2, 0, 0)));
        assert_eq!(fb.pixel(2, 3), Some(Color::new(4, 0, 0)));
        assert_eq!(fb.pixel(3, 3), Some(Color::new(5, 0, 0)));
        assert_eq!(fb.pixel(1, 1), Some(Color::BLACK));
    }

    #[test]
    fn raw_fully_outside_is_noop() {
        let mut fb = ShadowFramebuffer::new(4, 4);
        let before = fb.clone();
        fb.apply_raw(10, 10, 2, 2, &[Color::WHITE; 4]);
        fb.apply_raw(0, 4, 2, 2, &[Color::WHITE; 4]);
        assert_eq!(fb, before);
    }

    #[test]
    fn raw_with_short_pixel_block() {
        let mut fb = ShadowFramebuffer::new(4, 4);
        fb.apply_raw(0, 0, 2, 2, &[Color::WHITE; 3]);
        assert_eq!(fb.pixel(0, 1), Some(Color::WHITE));
        assert_eq!(fb.pixel(1, 1), Some(Color::BLACK));
    }

    #[test]
    fn fill_is_clipped() {
        let mut fb = ShadowFramebuffer::new(5, 5);
        fb.apply_fill(3, 3, 100, 100, Color::GREEN);
        assert_eq!(fb.pixels().iter().filter(|&&c| c == Color::GREEN).count(), 4);
    }

    #[test]
    fn copy_onto_itself_is_noop() {
        let mut fb = gradient(12, 9);
        let before = fb.clone();
        fb.apply_copy(2, 3, 2, 3, 5, 4);
        assert_eq!(fb, before);
    }

    #[test]
    fn overlapping_copies_match_snapshot_semantics() {
        // Down-right, up-left, right-only and up-only overlaps.
        let cases = [
            (1, 1, 3, 2, 6, 5),
            (3, 2, 1, 1, 6, 5),
            (0, 4, 2, 4, 8, 3),
            (2, 3, 2, 1, 5, 6),
        ];
        for (sx, sy, dx, dy, w, h) in cases {
            let fb = gradient(12, 10);
            let expected = snapshot_copy(&fb, sx, sy, dx, dy, w, h);
            let mut actual = fb.clone();
            actual.apply_copy(sx, sy, dx, dy, w, h);
            assert_eq!(actual, expected, "copy {sx},{sy} -> {dx},{dy} {w}x{h}");
        }
    }

    #[test]
    fn copy_clips_at_both_ends() {
        let fb = gradient(8, 8);
        let expected = snapshot_copy(&fb, 5, 0, 0, 6, 6, 4);
        let mut actual = fb.clone();
        actual.apply_copy(5, 0, 0, 6, 6, 4);
        assert_eq!(actual, expected);

        let mut untouched = fb.clone();
        untouched.apply_copy(20, 20, 0, 0, 4, 4);
        assert_eq!(untouched, fb);
    }

    #[test]
    fn apply_dispatches_each_kind() {
        let mut fb = ShadowFramebuffer::new(6, 6);
        fb.apply(&UpdateEvent::Fill {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
            color: Color::RED,
        });
        fb.apply(&UpdateEvent::Copy {
            src_x: 0,
            src_y: 0,
            dst_x: 4,
            dst_y: 4,
            width: 2,
            height: 2,
        });
        fb.apply(&UpdateEvent::Raw {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            pixels: vec![Color::BLUE],
        });
        assert_eq!(fb.pixel(0, 0), Some(Color::BLUE));
        assert_eq!(fb.pixel(1, 1), Some(Color::RED));
        assert_eq!(fb.pixel(5, 5), Some(Color::RED));
        assert_eq!(fb.pixel(4, 4), Some(Color::RED));
    }
}
