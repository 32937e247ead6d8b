//! Mirror session: the coordinator of the pipeline.
//!
//! Owns the [`ShadowFramebuffer`] and drives, on every commit:
//!
//! 1. [`Resampler`] reduces the framebuffer to the target grid.
//! 2. [`FrameEncoder`] serialises the grid.
//! 3. [`FrameSink`] sends the datagram to the matrix.
//! 4. [`FrameRateTracker`] records the commit.
//!
//! Events arrive as an ordered stream of [`SessionEvent`]s and are
//! handled one at a time, so a `Copy` always sees every earlier write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, MirrorError};
use crate::mirror::encoder::FrameEncoder;
use crate::mirror::framebuffer::ShadowFramebuffer;
use crate::mirror::framerate::{DEFAULT_SMOOTHING, FrameRateTracker};
use crate::mirror::resample::{ResampleFilter, Resampler};
use crate::mirror::transport::{FrameSink, MAX_DATAGRAM_SIZE};
use crate::mirror::types::{Color, SessionEvent, TargetGrid, UpdateEvent};

/// The only remote pixel depth the pipeline accepts.
pub const SUPPORTED_COLOR_DEPTH: u8 = 32;

// ── SessionConfig ────────────────────────────────────────────────

/// Configuration for [`MirrorSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Matrix width in pixels.
    pub grid_width: u32,
    /// Matrix height in pixels.
    pub grid_height: u32,
    /// Compositing layer written into every frame.
    pub layer: u32,
    /// Downsampling filter.
    pub filter: ResampleFilter,
    /// Remote pixel depth in bits.
    pub color_depth: u8,
    /// Send a blank frame as soon as a connection announces its geometry.
    pub clear_on_connect: bool,
    /// EWMA smoothing for the framerate tracker.
    pub framerate_smoothing: f64,
    /// Minimum interval between framerate log lines.
    pub framerate_report_every: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid_width: 45,
            grid_height: 35,
            layer: 0,
            filter: ResampleFilter::Bilinear,
            color_depth: SUPPORTED_COLOR_DEPTH,
            clear_on_connect: true,
            framerate_smoothing: DEFAULT_SMOOTHING,
            framerate_report_every: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Reject configurations the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.color_depth != SUPPORTED_COLOR_DEPTH {
            return Err(ConfigError::UnsupportedColorDepth(self.color_depth));
        }
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(ConfigError::InvalidGridSize {
                width: self.grid_width,
                height: self.grid_height,
            });
        }
        if !(0.0..1.0).contains(&self.framerate_smoothing) {
            return Err(ConfigError::InvalidSmoothing(self.framerate_smoothing));
        }
        let size = FrameEncoder::encoded_len(self.grid_width, self.grid_height, self.layer);
        if size > MAX_DATAGRAM_SIZE {
            return Err(ConfigError::GridTooLarge {
                width: self.grid_width,
                height: self.grid_height,
                size,
                max: MAX_DATAGRAM_SIZE,
            });
        }
        Ok(())
    }
}

// ── Outcomes & stats ─────────────────────────────────────────────

/// What a commit did.
#[derive(Debug)]
pub enum CommitOutcome {
    /// One datagram of this many bytes went out.
    Sent(usize),
    /// Encoding succeeded but the send failed; the frame is lost.
    Dropped(MirrorError),
    /// No remote display yet, nothing to mirror.
    Skipped,
}

/// Coarse connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for a geometry announcement.
    Uninitialized,
    /// Mirroring a remote display.
    Active,
}

/// Running counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Geometry announcements that activated a framebuffer.
    pub connections: u64,
    /// Commits handled while active.
    pub commits: u64,
    /// Datagrams handed to the sink, including clear frames.
    pub frames_sent: u64,
    /// Datagrams the sink failed to send.
    pub frames_dropped: u64,
    /// Updates applied to a framebuffer.
    pub updates_applied: u64,
    /// Updates received with no framebuffer to apply them to.
    pub updates_discarded: u64,
}

enum SessionState {
    Uninitialized,
    Active(ShadowFramebuffer),
}

// ── MirrorSession ────────────────────────────────────────────────

/// Mirrors one remote display onto the matrix.
///
/// # Lifetime
///
/// Feed events with [`handle`](Self::handle), or hand a whole stream to
/// [`run`](Self::run), which returns when the stream ends or
/// [`stop`](Self::stop) is called.
pub struct MirrorSession {
    config: SessionConfig,
    state: SessionState,
    resampler: Resampler,
    sink: Arc<dyn FrameSink>,
    framerate: FrameRateTracker,
    stats: SessionStats,
    running: Arc<AtomicBool>,
}

impl MirrorSession {
    /// Validate `config` and create an uninitialised session.
    pub fn new(config: SessionConfig, sink: Arc<dyn FrameSink>) -> Result<Self, MirrorError> {
        config.validate()?;
        Ok(Self {
            resampler: Resampler::new(config.grid_width, config.grid_height, config.filter),
            framerate: FrameRateTracker::new(config.framerate_smoothing),
            config,
            state: SessionState::Uninitialized,
            sink,
            stats: SessionStats::default(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Uninitialized => SessionPhase::Uninitialized,
            SessionState::Active(_) => SessionPhase::Active,
        }
    }

    /// The current shadow framebuffer, if a remote is connected.
    pub fn framebuffer(&self) -> Option<&ShadowFramebuffer> {
        match &self.state {
            SessionState::Active(fb) => Some(fb),
            SessionState::Uninitialized => None,
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Smoothed commit rate, if known.
    pub fn framerate(&self) -> Option<f64> {
        self.framerate.current_rate()
    }

    /// A cloneable handle that stops [`run`](Self::run) when set to
    /// `false`.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal [`run`](Self::run) to return.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether [`run`](Self::run) is currently consuming events.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Dispatch one inbound event.
    pub async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Geometry { width, height } => self.announce_geometry(width, height).await,
            SessionEvent::Update(update) => self.apply(&update),
            SessionEvent::Commit => {
                self.commit().await;
            }
            SessionEvent::Disconnected => self.disconnect(),
        }
    }

    /// Start mirroring a `width × height` remote display.
    ///
    /// Always allocates a fresh framebuffer; a zero-area geometry is
    /// ignored.
    pub async fn announce_geometry(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            warn!("ignoring empty remote geometry {width}x{height}");
            return;
        }
        if matches!(self.state, SessionState::Active(_)) {
            debug!("new geometry while active; replacing framebuffer");
        }

        info!(
            "mirroring {width}x{height} remote onto {}x{} layer {}",
            self.config.grid_width, self.config.grid_height, self.config.layer
        );
        self.state = SessionState::Active(ShadowFramebuffer::new(width, height));
        self.framerate.reset();
        self.stats.connections += 1;

        if self.config.clear_on_connect {
            let blank = TargetGrid::filled(
                self.config.grid_width,
                self.config.grid_height,
                self.config.layer,
                Color::BLACK,
            );
            self.deliver(&blank).await;
        }
    }

    /// Apply one update to the framebuffer, in arrival order.
    pub fn apply(&mut self, update: &UpdateEvent) {
        match &mut self.state {
            SessionState::Active(fb) => {
                fb.apply(update);
                self.stats.updates_applied += 1;
            }
            SessionState::Uninitialized => {
                debug!("discarding {} update: no remote geometry yet", update.kind());
                self.stats.updates_discarded += 1;
            }
        }
    }

    /// Mirror the current framebuffer: resample, encode, send, observe.
    pub async fn commit(&mut self) -> CommitOutcome {
        let SessionState::Active(fb) = &self.state else {
            debug!("commit before geometry; nothing to mirror");
            return CommitOutcome::Skipped;
        };

        let grid = self.resampler.resample(fb, self.config.layer);
        let outcome = self.deliver(&grid).await;

        self.stats.commits += 1;
        self.framerate.observe();
        let now = Instant::now();
        if self.framerate.should_report(now, self.config.framerate_report_every) {
            if let Some(rate) = self.framerate.current_rate() {
                info!("framerate: {rate:.1}");
            }
        }

        outcome
    }

    /// Drop the framebuffer; a new geometry is needed to resume.
    pub fn disconnect(&mut self) {
        if matches!(self.state, SessionState::Active(_)) {
            info!("remote display disconnected");
        }
        self.state = SessionState::Uninitialized;
        self.framerate.reset();
    }

    /// Consume `events` until the stream ends or the session is stopped.
    ///
    /// The end of the stream counts as a disconnect.
    pub async fn run<St>(&mut self, mut events: St) -> SessionStats
    where
        St: Stream<Item = SessionEvent> + Unpin,
    {
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);

        while running.load(Ordering::SeqCst) {
            let next = tokio::select! {
                ev = events.next() => ev,
                _ = Self::wait_for_stop(&running) => break,
            };
            match next {
                Some(event) => self.handle(event).await,
                None => {
                    debug!("event stream ended");
                    break;
                }
            }
        }

        self.disconnect();
        self.running.store(false, Ordering::SeqCst);
        self.stats
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn deliver(&mut self, grid: &TargetGrid) -> CommitOutcome {
        let frame = FrameEncoder::encode(grid);
        match self.sink.send_frame(&frame).await {
            Ok(sent) => {
                self.stats.frames_sent += 1;
                CommitOutcome::Sent(sent)
            }
            Err(e) => {
                warn!("dropped frame ({} bytes): {e}", frame.len());
                self.stats.frames_dropped += 1;
                CommitOutcome::Dropped(e)
            }
        }
    }

    /// Resolves when `running` becomes false.
    async fn wait_for_stop(running: &AtomicBool) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
