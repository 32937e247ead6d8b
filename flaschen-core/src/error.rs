//! Domain-specific error types for the mirroring pipeline.
//!
//! Rectangle updates never fail (they clip), so the only fallible
//! operations are configuration validation and the outbound UDP send.

use thiserror::Error;

/// The canonical error type for the mirroring pipeline.
#[derive(Debug, Error)]
pub enum MirrorError {
    // ── Configuration Errors ─────────────────────────────────────
    /// The session configuration was rejected before any network activity.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    // ── Transport Errors ─────────────────────────────────────────
    /// The UDP socket reported an error.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// An encoded frame does not fit in a single UDP datagram.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A target endpoint did not resolve to any socket address.
    #[error("could not resolve endpoint {0}")]
    Unresolved(String),
}

// ── ConfigError ──────────────────────────────────────────────────

/// Fatal configuration problems, raised at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Only 32 bits per pixel is accepted from the remote display.
    #[error("color depth {0} not supported (only 32 is)")]
    UnsupportedColorDepth(u8),

    /// The target grid must have a positive width and height.
    #[error("invalid grid size {width}x{height}")]
    InvalidGridSize { width: u32, height: u32 },

    /// The encoded frame for this grid would not fit one datagram.
    #[error("grid {width}x{height} encodes to {size} bytes (max {max})")]
    GridTooLarge {
        width: u32,
        height: u32,
        size: usize,
        max: usize,
    },

    /// EWMA smoothing must lie in `[0, 1)`.
    #[error("invalid framerate smoothing factor {0}")]
    InvalidSmoothing(f64),

    /// An endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A configuration file exists but could not be read or parsed.
    #[error("could not load config {path}: {reason}")]
    Load { path: String, reason: String },

    /// A named option had a value outside its accepted set.
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
