//! Configuration for the mirror service.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use flaschen_core::mirror::session::SessionConfig;
use flaschen_core::{ConfigError, ResampleFilter};

/// First TCP port of the VNC display range (display 0).
pub const VNC_BASE_PORT: u16 = 5900;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Remote display to mirror. The pattern source never contacts it.
    pub remote: RemoteConfig,
    /// Pixel matrix to mirror onto.
    pub target: TargetConfig,
    /// Pipeline settings.
    pub mirror: PipelineConfig,
    /// Upstream event source.
    pub source: SourceConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Remote display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Remote hostname.
    pub host: String,
    /// VNC display number (port 5900 + display).
    pub display: u16,
    /// Explicit TCP port, overriding `display`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Pixel matrix settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Matrix hostname.
    pub host: String,
    /// Matrix UDP port.
    pub port: u16,
    /// Matrix width in pixels.
    pub width: u32,
    /// Matrix height in pixels.
    pub height: u32,
    /// Compositing layer.
    pub layer: u32,
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resample filter: "bilinear", "box" or "nearest".
    pub filter: ResampleFilter,
    /// Remote colour depth in bits (only 32 is supported).
    pub color_depth: u8,
    /// Blank the matrix when a remote connects.
    pub clear_on_connect: bool,
}

/// Which upstream produces session events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Built-in moving test pattern.
    #[default]
    Pattern,
}

/// Upstream event source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source implementation.
    pub kind: SourceKind,
    /// Commits per second for generated sources.
    pub fps: u8,
    /// Reconnect after the upstream connection is lost.
    pub reconnect: bool,
    /// Delay before reconnecting, in milliseconds.
    pub reconnect_delay_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Seconds between framerate log lines.
    pub framerate_every_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            display: 0,
            port: None,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1337,
            width: 45,
            height: 35,
            layer: 0,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: ResampleFilter::Bilinear,
            color_depth: 32,
            clear_on_connect: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Pattern,
            fps: 10,
            reconnect: false,
            reconnect_delay_ms: 2000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            framerate_every_secs: 1,
        }
    }
}

// ── Endpoints ────────────────────────────────────────────────────

/// A resolved `(host, port)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl RemoteConfig {
    /// Parse `host`, `host:display` or `:display`.
    ///
    /// An empty host means `localhost`.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let (host, display) = match input.rsplit_once(':') {
            Some((host, display)) => {
                let display = display
                    .parse()
                    .map_err(|_| ConfigError::InvalidEndpoint(input.to_string()))?;
                (host, display)
            }
            None => (input, 0),
        };
        let host = if host.is_empty() { "localhost" } else { host };
        Ok(Self {
            host: host.to_string(),
            display,
            port: None,
        })
    }

    /// The TCP endpoint of the remote display.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self
                .port
                .unwrap_or_else(|| VNC_BASE_PORT.saturating_add(self.display)),
        }
    }
}

impl TargetConfig {
    /// Override host and port from a `host:port` string.
    pub fn set_address(&mut self, input: &str) -> Result<(), ConfigError> {
        let (host, port) = input
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidEndpoint(input.to_string()))?;
        let port = port
            .parse()
            .map_err(|_| ConfigError::InvalidEndpoint(input.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(ConfigError::InvalidEndpoint(input.to_string()));
        }
        self.host = host.to_string();
        self.port = port;
        Ok(())
    }

    /// The UDP endpoint of the matrix.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl MirrorConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults. A file that cannot be read or
    /// parsed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::Load {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };
        toml::from_str(&contents).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let cfg = Self::default();
        let text = toml::to_string_pretty(&cfg).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Check everything that must hold before any network activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_session_config().validate()?;
        if !(1..=60).contains(&self.source.fps) {
            return Err(ConfigError::InvalidValue {
                key: "source.fps",
                value: self.source.fps.to_string(),
            });
        }
        if self.target.host.is_empty() {
            return Err(ConfigError::InvalidEndpoint(self.target.endpoint().to_string()));
        }
        Ok(())
    }

    /// Convert pipeline settings into a `SessionConfig`.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            grid_width: self.target.width,
            grid_height: self.target.height,
            layer: self.target.layer,
            filter: self.mirror.filter,
            color_depth: self.mirror.color_depth,
            clear_on_connect: self.mirror.clear_on_connect,
            framerate_report_every: Duration::from_secs(self.logging.framerate_every_secs),
            ..SessionConfig::default()
        }
    }

    /// Delay between reconnection attempts.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.source.reconnect_delay_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────────
