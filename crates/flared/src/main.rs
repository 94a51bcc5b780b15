// # flared - flare DDNS Daemon
//
// This is a THIN integration layer. All reconciliation logic lives in
// flare-core; this binary only wires it together.
//
// The flared daemon is responsible for:
// 1. Reading `config.yml` from the working directory
// 2. Initializing logging and the runtime
// 3. Building the HTTP IP resolver and the Cloudflare provider
// 4. Running the Reconciler until SIGINT/SIGTERM
//
// ## Configuration
//
// ```yaml
// key: "<cloudflare api token>"
// account: "<account id>"
// zone: "<zone id>"
// record: "home.example.com"
// log_level: "info" # optional: trace, debug, info, warn, error
// ```
//
// There are no command line flags and no environment variables.

use anyhow::{Context, Result};
use flare_core::config::DEFAULT_CONFIG_PATH;
use flare_core::{Config, ReconcileConfig, ReconcileEvent, Reconciler};
use flare_ip_http::{DEFAULT_IP_SERVICE_URL, HttpIpResolver};
use flare_provider_cloudflare::CloudflareProvider;
use std::process::ExitCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or bootstrap error
/// - 2: Runtime error (startup reconciliation failed)
#[derive(Debug, Clone, Copy)]
enum FlaredExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or bootstrap failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<FlaredExitCode> for ExitCode {
    fn from(code: FlaredExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration; logging is not up yet because the level lives in it
    let config = match Config::load(DEFAULT_CONFIG_PATH) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error ({}): {}", DEFAULT_CONFIG_PATH, e);
            return FlaredExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FlaredExitCode::ConfigError.into();
    }

    info!("Starting flared daemon");
    info!("Loaded config from {}: {:?}", DEFAULT_CONFIG_PATH, config);

    // One reconciler, one task: a current-thread runtime is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FlaredExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let (reconciler, event_rx) = match build_reconciler(&config) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Bootstrap error: {:#}", e);
                return FlaredExitCode::ConfigError;
            }
        };

        let signals = match ShutdownSignals::new() {
            Ok(signals) => signals,
            Err(e) => {
                error!("Bootstrap error: {:#}", e);
                return FlaredExitCode::ConfigError;
            }
        };

        match run_daemon(reconciler, event_rx, signals).await {
            Ok(()) => {
                info!("Shutdown complete");
                FlaredExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                FlaredExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the resolver, provider and reconciler from the loaded config
fn build_reconciler(config: &Config) -> Result<(Reconciler, mpsc::Receiver<ReconcileEvent>)> {
    let resolver = HttpIpResolver::new(DEFAULT_IP_SERVICE_URL)
        .context("Failed to create IP resolver")?;

    let provider = CloudflareProvider::new(
        config.api_key.clone(),
        config.account_id.clone(),
        config.zone_id.clone(),
        config.record_name.clone(),
    )
    .context("Failed to create Cloudflare provider")?;

    info!("IP resolver: {}", resolver.url());
    info!("Managing record: {}", config.record_name);

    Reconciler::new(
        Box::new(resolver),
        Box::new(provider),
        ReconcileConfig::from(config),
    )
    .context("Failed to create reconciler")
}

/// Run the reconciler until a shutdown signal arrives
async fn run_daemon(
    mut reconciler: Reconciler,
    mut event_rx: mpsc::Receiver<ReconcileEvent>,
    mut signals: ShutdownSignals,
) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        let signal = signals.recv().await;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
    });

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!("Reconcile event: {:?}", event);
        }
    });

    reconciler
        .run(shutdown_rx)
        .await
        .context("Startup reconciliation failed")
}

/// Shutdown signal listener (SIGTERM, SIGINT)
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

        Ok(Self { sigterm, sigint })
    }

    /// Wait for either signal, returning its name
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Shutdown signal listener (Ctrl-C only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}
