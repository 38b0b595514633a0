#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

use std::{path::PathBuf, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::{self, ShutdownGuard},
    net::socket::Interface,
    telemetry::tracing::{self, Instrument as _},
    tls::boring::server::TlsAcceptorLayer,
};

use clap::Parser;

use echo_harness_lib::{
    http::EchoLimits,
    server::{self, EchoServerConfig},
    tls::ServerIdentity,
    utils,
};

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(test)]
pub mod test;

/// CLI arguments for configuring the echo server.
#[derive(Debug, Clone, Parser)]
#[command(name = "echo-harness-server")]
#[command(bin_name = "echo-harness-server")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// network interface to bind the echo server to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "0.0.0.0:443"
    )]
    pub bind: Interface,

    /// PEM file containing the server certificate (chain)
    #[arg(long, value_name = "PATH", default_value = "cert.pem")]
    pub cert: PathBuf,

    /// PEM file containing the private key of the server certificate
    #[arg(long, value_name = "PATH", default_value = "key.pem")]
    pub key: PathBuf,

    /// largest response body (in bytes) a client can ask for
    #[arg(long, value_name = "BYTES", default_value_t = EchoLimits::DEFAULT_MAX_SIZE)]
    pub max_size: u64,

    /// longest delay (in seconds) a client can ask for
    #[arg(long, value_name = "SECONDS", default_value_t = EchoLimits::DEFAULT_MAX_SLEEP)]
    pub max_sleep: u64,

    /// max amount of bytes read or written per connection
    #[arg(long, value_name = "BYTES", default_value_t = server::DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,

    /// directory to write the bound socket address (`echo.addr.txt`) into
    #[arg(long, short = 'D')]
    pub data: Option<PathBuf>,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 1.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,

    #[cfg(target_family = "unix")]
    /// Set the limit of max open file descriptors for this process and its children.
    #[arg(long, value_name = "N", default_value_t = 262_144)]
    pub ulimit: utils::os::rlim_t,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(Some(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    }))?;

    #[cfg(target_family = "unix")]
    utils::os::raise_nofile(args.ulimit).context("set file descriptor limit")?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// Runs the echo server and blocks until
/// a critical error occurs or the (graceful) shutdown has been initiated.
///
/// This entry point is used by both the (binary) `main` function as well as
/// for the e2e test suite found in the test module.
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    if let Some(ref data) = args.data {
        tokio::fs::create_dir_all(data)
            .await
            .context("create data directory")
            .with_context_debug_field("path", || data.clone())?;
    }

    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    // without a valid identity there is nothing to serve
    let tls_acceptor = ServerIdentity::try_load(&args.cert, &args.key)
        .await
        .context("load server identity")?
        .try_into_acceptor_layer()
        .context("prepare TLS acceptor")?;

    let cfg = EchoServerConfig {
        bind: args.bind.clone(),
        limits: EchoLimits {
            max_size: args.max_size,
            max_sleep: args.max_sleep,
        },
        body_limit: args.body_limit,
        data: args.data.clone(),
    };

    let (error_tx, error_rx) = tokio::sync::mpsc::channel::<BoxError>(1);
    let graceful = graceful::Shutdown::new(new_shutdown_signal(error_rx, base_shutdown_signal));

    graceful.spawn_task_fn(move |guard| run_echo_https_server(cfg, guard, error_tx, tls_acceptor));

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::info!("gracefully shutdown with a delay of: {delay:?}");
    Ok(())
}

async fn run_echo_https_server(
    cfg: EchoServerConfig,
    guard: ShutdownGuard,
    error_tx: tokio::sync::mpsc::Sender<BoxError>,
    tls_acceptor: TlsAcceptorLayer,
) {
    tracing::info!("spawning echo https server...");
    if let Err(err) = server::run_echo_https_server(cfg, guard, tls_acceptor, None)
        .instrument(tracing::debug_span!(
            "echo server lifetime",
            server.service.name = utils::env::project_name(),
            otel.kind = "server",
            network.protocol.name = "http",
        ))
        .await
    {
        tracing::error!("echo server exited with an error: {err}");
        let _ = error_tx.send(err).await;
    }
}

fn new_shutdown_signal(
    error_rx: tokio::sync::mpsc::Receiver<BoxError>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        let mut mut_error_rx = error_rx;
        let mut signal = Box::pin(base_shutdown_signal);

        tokio::select! {
            _ = signal.as_mut() => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            err = mut_error_rx.recv() => {
                if let Some(err) = err {
                    tracing::error!("fatal err received: {err}; abort");
                } else {
                    tracing::info!("wait for default signal, no error was received");
                    signal.await;
                    tracing::debug!("default signal triggered: init graceful shutdown");
                }
            }
        }
    }
}
