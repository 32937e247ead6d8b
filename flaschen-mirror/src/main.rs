//! flaschen-mirror entry point.
//!
//! ```text
//! flaschen-mirror                        Run with defaults
//! flaschen-mirror --config <path>        Load a custom config TOML
//! flaschen-mirror --target host:port     Override the matrix address
//! flaschen-mirror --remote host:display  Override the remote display
//! flaschen-mirror --gen-config <path>    Write default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flaschen_mirror::config::{MirrorConfig, RemoteConfig, SourceKind};
use flaschen_mirror::service::MirrorService;
use flaschen_mirror::source::{EventSource, PatternSource};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "flaschen-mirror", about = "Mirror a remote display onto a UDP pixel matrix")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "flaschen-mirror.toml")]
    config: PathBuf,

    /// Matrix address (overrides config). Example: ft.local:1337
    #[arg(short, long)]
    target: Option<String>,

    /// Remote display (overrides config). Example: desk:1
    ///
    /// The built-in pattern source does not connect anywhere and ignores it.
    #[arg(short, long)]
    remote: Option<String>,

    /// Matrix layer (overrides config).
    #[arg(short, long)]
    layer: Option<u32>,

    /// Write the default configuration to PATH and exit.
    #[arg(long, value_name = "PATH")]
    gen_config: Option<PathBuf>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: write defaults and exit.
    if let Some(path) = cli.gen_config.as_deref() {
        MirrorConfig::write_default(path)?;
        println!("wrote default configuration to {}", path.display());
        return Ok(());
    }

    // Load config and apply CLI overrides.
    let mut config = match MirrorConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!("{e}");
            return Err(e.into());
        }
    };
    if let Some(target) = cli.target.as_deref() {
        config.target.set_address(target)?;
    }
    if let Some(remote) = cli.remote.as_deref() {
        config.remote = RemoteConfig::parse(remote)?;
    }
    if let Some(layer) = cli.layer {
        config.target.layer = layer;
    }

    init_tracing(&config.logging.level);

    info!("flaschen-mirror v{}", env!("CARGO_PKG_VERSION"));
    if !cli.config.exists() {
        info!("no config at {}; using defaults", cli.config.display());
    }
    if let Err(e) = config.validate() {
        error!("{e}");
        return Err(e.into());
    }
    info!("matrix: {}", config.target.endpoint());
    info!(
        "grid: {}x{} layer {} ({} filter)",
        config.target.width, config.target.height, config.target.layer, config.mirror.filter
    );

    let mut source: Box<dyn EventSource> = match config.source.kind {
        SourceKind::Pattern => {
            info!("pattern source: remote {} is not contacted", config.remote.endpoint());
            Box::new(PatternSource::new(640, 480, config.source.fps))
        }
    };

    let service = MirrorService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run(source.as_mut()).await?;

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
