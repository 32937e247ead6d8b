//! # Mirroring pipeline
//!
//! Shadows a remote display and mirrors it onto a fixed-size pixel
//! matrix, one UDP datagram per commit.
//!
//! ## Architecture
//!
//! ```text
//! RFB collaborator                 MirrorSession
//! ┌──────────────────┐            ┌─────────────────────────────┐
//! │ Geometry         │            │ ShadowFramebuffer           │
//! │ Update(Raw/      │  ordered   │   ↓ (on Commit)             │
//! │   Copy/Fill)     │ ─────────► │ Resampler → TargetGrid      │
//! │ Commit           │  stream    │   ↓                         │
//! │ Disconnected     │            │ FrameEncoder → EncodedFrame │
//! └──────────────────┘            │   ↓                         │
//!                                 │ FrameSink (UDP) ──► matrix  │
//!                                 │   ↓                         │
//!                                 │ FrameRateTracker            │
//!                                 └─────────────────────────────┘
//! ```
//!
//! ## Sub-modules
//!
//! | Module        | Purpose                                            |
//! |---------------|----------------------------------------------------|
//! | `types`       | Colours, pixel formats, update and session events  |
//! | `framebuffer` | Full-resolution shadow of the remote display       |
//! | `resample`    | Filtered reduction to the target grid              |
//! | `encoder`     | PPM-style datagram encoding with black remap       |
//! | `transport`   | Single-datagram UDP sender                         |
//! | `framerate`   | EWMA commit-rate tracker                           |
//! | `session`     | Coordinator state machine                          |

pub mod encoder;
pub mod framebuffer;
pub mod framerate;
pub mod resample;
pub mod session;
pub mod transport;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use encoder::{EncodedFrame, FrameEncoder};
pub use framebuffer::ShadowFramebuffer;
pub use framerate::FrameRateTracker;
pub use resample::{ResampleFilter, Resampler};
pub use session::{
    CommitOutcome, MirrorSession, SUPPORTED_COLOR_DEPTH, SessionConfig, SessionPhase, SessionStats,
};
pub use transport::{DatagramTransport, FrameSink, MAX_DATAGRAM_SIZE};
pub use types::{Color, PixelFormat, Rect, SessionEvent, TargetGrid, UpdateEvent};
