//! Pixel-matrix frame encoder.
//!
//! Serialises a [`TargetGrid`] into the datagram format understood by
//! the matrix: a binary PPM image followed by an offset/layer footer.
//!
//! ## Wire format
//!
//! ```text
//! "P6\n"
//! "<width> <height>\n"
//! "255\n"
//! <width * height * 3 bytes>   R, G, B per pixel, y outer, x inner
//! "\n"
//! "0\n"                         x offset
//! "0\n"                         y offset
//! "<layer>\n"
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::mirror::types::TargetGrid;

const OFFSETS: &[u8] = b"\n0\n0\n";

// ── EncodedFrame ─────────────────────────────────────────────────

/// One encoded datagram, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Grid width the frame was built from.
    pub width: u32,
    /// Grid height the frame was built from.
    pub height: u32,
    /// Layer named in the footer.
    pub layer: u32,
    /// Complete datagram payload.
    pub data: Bytes,
}

impl EncodedFrame {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Byte range of the pixel body inside [`data`](Self::data).
    pub fn body_range(&self) -> std::ops::Range<usize> {
        let start = header(self.width, self.height).len();
        start..start + body_len(self.width, self.height)
    }
}

// ── FrameEncoder ─────────────────────────────────────────────────

/// Stateless encoder for the matrix wire format.
pub struct FrameEncoder;

impl FrameEncoder {
    /// Encode `grid`, remapping pure black to the near-black colour.
    pub fn encode(grid: &TargetGrid) -> EncodedFrame {
        let head = header(grid.width, grid.height);
        let foot = footer(grid.layer);
        let body = body_len(grid.width, grid.height);

        let mut buf = BytesMut::with_capacity(head.len() + body + foot.len());
        buf.put_slice(head.as_bytes());
        for px in &grid.pixels {
            let px = px.sentinel_safe();
            buf.put_slice(&[px.r, px.g, px.b]);
        }
        buf.put_slice(&foot);

        EncodedFrame {
            width: grid.width,
            height: grid.height,
            layer: grid.layer,
            data: buf.freeze(),
        }
    }

    /// Exact datagram size for a grid of this shape.
    pub fn encoded_len(width: u32, height: u32, layer: u32) -> usize {
        header(width, height).len() + body_len(width, height) + footer(layer).len()
    }
}

fn header(width: u32, height: u32) -> String {
    format!("P6\n{width} {height}\n255\n")
}

fn footer(layer: u32) -> Vec<u8> {
    let mut out = OFFSETS.to_vec();
    out.extend_from_slice(format!("{layer}\n").as_bytes());
    out
}

fn body_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

// ── Tests ────────────────────────────────────────────────────────
