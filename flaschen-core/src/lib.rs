//! # flaschen-core
//!
//! Mirrors a remote display onto a Flaschen-Taschen style pixel matrix.
//!
//! This crate contains:
//! - **Events**: `UpdateEvent` / `SessionEvent`, the decoded input from a
//!   remote-framebuffer collaborator
//! - **Framebuffer**: `ShadowFramebuffer`, clipped raw/copy/fill updates
//! - **Resampling**: `Resampler` with bilinear, box and nearest filters
//! - **Encoding**: `FrameEncoder`, the matrix's PPM datagram format
//! - **Transport**: `DatagramTransport`, one UDP datagram per frame
//! - **Session**: `MirrorSession`, the ordered commit pipeline
//! - **Error**: `MirrorError`: typed, `thiserror`-based error hierarchy

pub mod error;
pub mod mirror;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::{ConfigError, MirrorError};
pub use mirror::{
    Color, CommitOutcome, DatagramTransport, EncodedFrame, FrameEncoder, FrameRateTracker,
    FrameSink, MAX_DATAGRAM_SIZE, MirrorSession, PixelFormat, ResampleFilter, Resampler,
    SUPPORTED_COLOR_DEPTH, SessionConfig, SessionEvent, SessionPhase, SessionStats,
    ShadowFramebuffer, TargetGrid, UpdateEvent,
};
