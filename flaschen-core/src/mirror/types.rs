//! Shared types for the mirroring pipeline.
//!
//! [`UpdateEvent`] and [`SessionEvent`] form the inbound boundary: the
//! remote-framebuffer collaborator decodes protocol rectangles into these
//! values and hands them over in protocol order.

use serde::{Deserialize, Serialize};

// ── Color ────────────────────────────────────────────────────────

/// A single RGB pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const NEAR_BLACK: Color = Color::new(1, 1, 1);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Decode one pixel laid out in `format`.
    ///
    /// Returns `None` if `bytes` is shorter than one pixel. Alpha is
    /// ignored.
    pub fn from_pixel(bytes: &[u8], format: PixelFormat) -> Option<Self> {
        if bytes.len() < format.bytes_per_pixel() {
            return None;
        }
        Some(match format {
            PixelFormat::Bgra8 => Color::new(bytes[2], bytes[1], bytes[0]),
            PixelFormat::Rgba8 | PixelFormat::Rgb8 => Color::new(bytes[0], bytes[1], bytes[2]),
        })
    }

    /// The matrix treats pure black as "transparent", so a displayed
    /// black pixel must go out as `(1, 1, 1)`.
    pub const fn sentinel_safe(self) -> Self {
        if self.r == 0 && self.g == 0 && self.b == 0 {
            Self::NEAR_BLACK
        } else {
            self
        }
    }
}

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout of raw rectangle data received from the remote display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, padding/alpha.
    Bgra8,
    /// 4 bytes per pixel: Red, Green, Blue, padding/alpha.
    Rgba8,
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }

    /// Color depth in bits, as negotiated with the remote display.
    pub const fn depth(self) -> u8 {
        (self.bytes_per_pixel() * 8) as u8
    }
}

// ── Rect ─────────────────────────────────────────────────────────

/// A rectangle already clipped to framebuffer bounds.
///
/// Always non-empty; clipping an empty or fully out-of-bounds
/// rectangle yields `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    /// Intersect `(x, y, width, height)` with `[0, bound_w) × [0, bound_h)`.
    pub fn clip(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bound_w: usize,
        bound_h: usize,
    ) -> Option<Rect> {
        let (x, y) = (x as usize, y as usize);
        let right = x.saturating_add(width as usize).min(bound_w);
        let bottom = y.saturating_add(height as usize).min(bound_h);
        if x >= right || y >= bottom {
            return None;
        }
        Some(Rect {
            x,
            y,
            width: right - x,
            height: bottom - y,
        })
    }
}

// ── TargetGrid ───────────────────────────────────────────────────

/// The fixed-resolution image sent to the pixel matrix.
///
/// Rebuilt from scratch on every commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGrid {
    /// Grid width in matrix pixels.
    pub width: u32,
    /// Grid height in matrix pixels.
    pub height: u32,
    /// Compositing layer on the matrix.
    pub layer: u32,
    /// Row-major pixels, `width * height` long.
    pub pixels: Vec<Color>,
}

impl TargetGrid {
    /// A grid filled with one colour.
    pub fn filled(width: u32, height: u32, layer: u32, color: Color) -> Self {
        Self {
            width,
            height,
            layer,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// The pixel at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

// ── UpdateEvent ──────────────────────────────────────────────────

/// A decoded rectangle update from the remote display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// Row-major `width × height` pixels written at `(x, y)`.
    Raw {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: Vec<Color>,
    },
    /// Block copy inside the framebuffer; regions may overlap.
    Copy {
        src_x: u32,
        src_y: u32,
        dst_x: u32,
        dst_y: u32,
        width: u32,
        height: u32,
    },
    /// Uniform-colour block.
    Fill {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: Color,
    },
}

impl UpdateEvent {
    /// Build a `Raw` update from packed pixel bytes in `format`.
    ///
    /// A trailing partial pixel is discarded.
    pub fn raw_from_bytes(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
        format: PixelFormat,
    ) -> Self {
        let pixels = data
            .chunks_exact(format.bytes_per_pixel())
            .filter_map(|px| Color::from_pixel(px, format))
            .collect();
        UpdateEvent::Raw {
            x,
            y,
            width,
            height,
            pixels,
        }
    }

    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateEvent::Raw { .. } => "raw",
            UpdateEvent::Copy { .. } => "copy",
            UpdateEvent::Fill { .. } => "fill",
        }
    }
}

// ── SessionEvent ─────────────────────────────────────────────────

/// One item of the ordered stream a collaborator feeds a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The remote display reported its geometry (new connection).
    Geometry { width: u32, height: u32 },
    /// A rectangle update to apply.
    Update(UpdateEvent),
    /// End of an update batch: mirror the framebuffer now.
    Commit,
    /// The upstream connection was lost.
    Disconnected,
}

impl From<UpdateEvent> for SessionEvent {
    fn from(update: UpdateEvent) -> Self {
        SessionEvent::Update(update)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_remaps_only_pure_black() {
        assert_eq!(Color::BLACK.sentinel_safe(), Color::NEAR_BLACK);
        assert_eq!(Color::new(0, 0, 1).sentinel_safe(), Color::new(0, 0, 1));
        assert_eq!(Color::RED.sentinel_safe(), Color::RED);
        assert_eq!(Color::NEAR_BLACK.sentinel_safe(), Color::NEAR_BLACK);
    }

    #[test]
    fn pixel_decoding_per_format() {
        let bytes = [10, 20, 30, 255];
        assert_eq!(
            Color::from_pixel(&bytes, PixelFormat::Bgra8),
            Some(Color::new(30, 20, 10))
        );
        assert_eq!(
            Color::from_pixel(&bytes, PixelFormat::Rgba8),
            Some(Color::new(10, 20, 30))
        );
        assert_eq!(Color::from_pixel(&bytes[..2], PixelFormat::Rgb8), None);
        assert_eq!(PixelFormat::Rgba8.depth(), 32);
    }

    #[test]
    fn raw_from_bytes_drops_partial_pixel() {
        let data = [1, 2, 3, 0, 4, 5, 6, 0, 7];
        let ev = UpdateEvent::raw_from_bytes(0, 0, 2, 1, &data, PixelFormat::Rgba8);
        match ev {
            UpdateEvent::Raw { pixels, .. } => {
                assert_eq!(pixels, vec![Color::new(1, 2, 3), Color::new(4, 5, 6)]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn clip_inside_partial_and_outside() {
        assert_eq!(
            Rect::clip(2, 3, 4, 5, 10, 10),
            Some(Rect {
                x: 2,
                y: 3,
                width: 4,
                height: 5
            })
        );
        assert_eq!(
            Rect::clip(8, 8, 10, 10, 10, 10),
            Some(Rect {
                x: 8,
                y: 8,
                width: 2,
                height: 2
            })
        );
        assert_eq!(Rect::clip(10, 0, 1, 1, 10, 10), None);
        assert_eq!(Rect::clip(0, 0, 0, 5, 10, 10), None);
        assert_eq!(Rect::clip(u32::MAX, 0, u32::MAX, 1, 10, 10), None);
    }
}
