//! Upstream event sources.
//!
//! An [`EventSource`] stands in for the remote-framebuffer client: it
//! connects to a remote display and yields that connection's ordered
//! [`SessionEvent`]s. The channel closing means the connection is gone.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use flaschen_core::{Color, MirrorError, SessionEvent, UpdateEvent};

use crate::config::Endpoint;

/// Events buffered between a source task and the session.
const EVENT_BUFFER: usize = 256;

// ── EventSource ──────────────────────────────────────────────────

/// Produces the decoded event stream of one remote connection.
#[async_trait]
pub trait EventSource: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Connect to `remote` and return the receiving end of its events.
    async fn connect(
        &mut self,
        remote: &Endpoint,
    ) -> Result<mpsc::Receiver<SessionEvent>, MirrorError>;
}

// ── PatternSource ────────────────────────────────────────────────

/// Synthetic display: colour bars scrolling left, one column per commit.
///
/// Useful for checking matrix wiring and layer compositing without a
/// remote display. Every tick scrolls with a `Copy`, paints the exposed
/// strip with a `Fill`, and commits.
pub struct PatternSource {
    width: u32,
    height: u32,
    interval: Duration,
    frame_limit: Option<u64>,
}

impl PatternSource {
    /// A `width × height` pattern committed `fps` times per second.
    pub fn new(width: u32, height: u32, fps: u8) -> Self {
        Self {
            width,
            height,
            interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            frame_limit: None,
        }
    }

    /// End the connection after `frames` commits.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Opening image: one vertical bar per hue band.
    fn opening(width: u32, height: u32) -> Vec<SessionEvent> {
        let bars = 8u32;
        let bar_width = width.div_ceil(bars);
        let mut events = vec![SessionEvent::Geometry { width, height }];
        for i in 0..bars {
            events.push(
                UpdateEvent::Fill {
                    x: i * bar_width,
                    y: 0,
                    width: bar_width,
                    height,
                    color: hue(i * 360 / bars),
                }
                .into(),
            );
        }
        // Black band across the middle third.
        events.push(
            UpdateEvent::Fill {
                x: 0,
                y: height / 3,
                width,
                height: height / 3,
                color: Color::BLACK,
            }
            .into(),
        );
        events.push(SessionEvent::Commit);
        events
    }

    /// One scroll step: shift left by `step`, paint the right edge.
    fn scroll(width: u32, height: u32, step: u32, tick: u64) -> [SessionEvent; 3] {
        let step = step.min(width);
        [
            UpdateEvent::Copy {
                src_x: step,
                src_y: 0,
                dst_x: 0,
                dst_y: 0,
                width: width - step,
                height,
            }
            .into(),
            UpdateEvent::Fill {
                x: width - step,
                y: 0,
                width: step,
                height,
                color: hue((tick * 7 % 360) as u32),
            }
            .into(),
            SessionEvent::Commit,
        ]
    }
}

#[async_trait]
impl EventSource for PatternSource {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn connect(
        &mut self,
        remote: &Endpoint,
    ) -> Result<mpsc::Receiver<SessionEvent>, MirrorError> {
        debug!("pattern source ignores remote {remote}");
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (width, height) = (self.width, self.height);
        let interval = self.interval;
        let limit = self.frame_limit;
        let step = (width / 45).max(1);

        tokio::spawn(async move {
            for event in Self::opening(width, height) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }

            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            let mut tick: u64 = 1;
            while limit.is_none_or(|l| tick < l) {
                ticker.tick().await;
                for event in Self::scroll(width, height, step, tick) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                tick += 1;
            }
        });

        Ok(rx)
    }
}

/// Fully saturated colour at `degrees` on the hue wheel.
fn hue(degrees: u32) -> Color {
    let h = degrees % 360;
    let x = ((60 - (h % 120).abs_diff(60)) * 255 / 60) as u8;
    match h / 60 {
        0 => Color::new(255, x, 0),
        1 => Color::new(x, 255, 0),
        2 => Color::new(0, 255, x),
        3 => Color::new(0, x, 255),
        4 => Color::new(x, 0, 255),
        _ => Color::new(255, 0, x),
    }
}

// ── Tests ────────────────────────────────────────────────────────
