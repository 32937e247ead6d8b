//! Mirror service core logic.
//!
//! Wires an [`EventSource`] to a [`MirrorSession`] sending to the
//! matrix, and owns the reconnect policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use flaschen_core::{DatagramTransport, FrameSink, MirrorError, MirrorSession};

use crate::config::MirrorConfig;
use crate::source::EventSource;

// ── MirrorService ────────────────────────────────────────────────

/// The top-level mirror service.
pub struct MirrorService {
    config: MirrorConfig,
    running: Arc<AtomicBool>,
}

impl MirrorService {
    /// Create a new service with the given config.
    pub fn new(config: MirrorConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task (e.g. a Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Validate the config, bind the matrix transport and run.
    pub async fn run(&self, source: &mut dyn EventSource) -> Result<(), MirrorError> {
        self.config.validate()?;
        let target = self.config.target.endpoint();
        let transport = DatagramTransport::bind(&target.to_string()).await?;
        info!("matrix at {target} ({})", transport.remote_addr());
        self.run_with_sink(source, Arc::new(transport)).await
    }

    /// Run sessions against `sink` until stopped or, without
    /// reconnect, until the first connection ends.
    ///
    /// 1. Connects the source to the configured remote.
    /// 2. Feeds its events through a fresh session pass.
    /// 3. On disconnect, waits `reconnect_delay_ms` and repeats if
    ///    `reconnect` is enabled.
    pub async fn run_with_sink(
        &self,
        source: &mut dyn EventSource,
        sink: Arc<dyn FrameSink>,
    ) -> Result<(), MirrorError> {
        let mut session = MirrorSession::new(self.config.to_session_config(), sink)?;
        let remote = self.config.remote.endpoint();
        self.running.store(true, Ordering::SeqCst);

        while self.running.load(Ordering::SeqCst) {
            match source.connect(&remote).await {
                Ok(rx) => {
                    if !self.is_running() {
                        debug!("stopped while connecting; dropping connection");
                        break;
                    }
                    info!("{} source connected to {remote}", source.name());

                    // The session's own stop flag is reset by `run`, so the
                    // service flag is watched here instead.
                    let finished = tokio::select! {
                        stats = session.run(ReceiverStream::new(rx)) => Some(stats),
                        _ = Self::wait_for_stop(&self.running) => None,
                    };
                    let stats = finished.unwrap_or_else(|| {
                        session.stop();
                        session.disconnect();
                        session.stats()
                    });
                    info!(
                        "connection to {remote} ended: {} commits, {} frames sent, {} dropped",
                        stats.commits, stats.frames_sent, stats.frames_dropped
                    );
                }
                Err(e) => warn!("cannot connect to {remote}: {e}"),
            }

            if !self.config.source.reconnect {
                break;
            }
            let delay = self.config.reconnect_delay();
            info!("reconnecting in {delay:?}");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = Self::wait_for_stop(&self.running) => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("mirror service stopped");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &AtomicBool) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
