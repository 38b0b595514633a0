#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

use std::{path::PathBuf, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful,
    telemetry::tracing::{self, Instrument as _},
};

use clap::Parser;

use echo_harness_lib::{
    client::LoadShape,
    tls::{Scenario, try_load_trust_store},
    utils,
};

pub mod load;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// CLI arguments for configuring the load client.
///
/// The target is read from the environment:
/// `PORT` and the host variable of each scenario
/// (`HOST`, `HOST_TLS12` or `HOST_TLS13`).
#[derive(Debug, Clone, Parser)]
#[command(name = "echo-harness-client")]
#[command(bin_name = "echo-harness-client")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// TLS scenario(s) to pick from (at random) for each request
    #[arg(
        long = "scenario",
        short = 's',
        value_name = "SCENARIO",
        default_values_t = [Scenario::InsecureAny],
    )]
    pub scenarios: Vec<Scenario>,

    /// PEM file with extra trusted (CA) certificates, used by the verify-peer scenario
    #[arg(long, value_name = "PATH")]
    pub ca: Option<PathBuf>,

    /// requested response sizes are drawn from [0, N)
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub size_max: u64,

    /// requested server delays (in seconds) are drawn from [0, N)
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub sleep_max: u64,

    /// minimum length of the random request payload
    #[arg(long, value_name = "BYTES", default_value_t = 100)]
    pub payload_min: usize,

    /// maximum (exclusive) length of the random request payload
    #[arg(long, value_name = "BYTES", default_value_t = 10_000)]
    pub payload_max: usize,

    /// pause between two requests
    #[arg(long, value_name = "SECONDS", default_value_t = 0.5)]
    pub interval: f64,

    /// bound a single request (response body included), no timeout if omitted
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// stop after N requests (0 = run forever)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub iterations: u64,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 0.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(Some(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    }))?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// Run the load loop with the given args until it is done
/// or the (graceful) shutdown has been initiated.
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    let cfg = try_new_load_config(&args).await?;
    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    tracing::info!(
        scenarios = ?cfg.scenarios,
        shape = ?cfg.shape,
        interval = ?cfg.interval,
        timeout = ?cfg.timeout,
        iterations = ?cfg.iterations,
        "load client config ready",
    );

    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(done_rx, base_shutdown_signal));

    graceful.spawn_task_fn(async move |guard| {
        let summary = load::run_load_loop(cfg, guard)
            .instrument(tracing::debug_span!(
                "load loop lifetime",
                otel.kind = "client",
                network.protocol.name = "http",
            ))
            .await;
        tracing::info!(ok = summary.ok, failed = summary.failed, "load loop finished");
        drop(done_tx);
    });

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::debug!("gracefully shutdown with a delay of: {delay:?}");
    Ok(())
}

async fn try_new_load_config(args: &Args) -> Result<load::LoadConfig, BoxError> {
    let mut scenarios = args.scenarios.clone();
    scenarios.sort_by_key(|s| s.as_str());
    scenarios.dedup();
    if scenarios.is_empty() {
        return Err(BoxError::from("at least one scenario is required"));
    }

    if args.payload_min > args.payload_max {
        return Err(BoxError::from(format!(
            "invalid payload range: min {} > max {}",
            args.payload_min, args.payload_max
        )));
    }

    let interval = try_duration_from_secs("interval", args.interval)?;
    let timeout = args
        .timeout
        .map(|secs| try_duration_from_secs("timeout", secs))
        .transpose()?
        .filter(|d| !d.is_zero());

    let targets = load::Targets::try_from_env(&scenarios).context("resolve load targets")?;

    let trust_store = match args.ca {
        Some(ref path) => Some(try_load_trust_store(path).await?),
        None => None,
    };

    Ok(load::LoadConfig {
        scenarios,
        targets,
        shape: LoadShape {
            size: 0..args.size_max,
            sleep: 0..args.sleep_max,
            payload_len: args.payload_min..args.payload_max,
        },
        trust_store,
        interval,
        timeout,
        iterations: (args.iterations > 0).then_some(args.iterations),
    })
}

fn try_duration_from_secs(name: &'static str, secs: f64) -> Result<Duration, BoxError> {
    Duration::try_from_secs_f64(secs).map_err(|err| {
        BoxError::from(format!("invalid {name} ({secs}): {err}"))
    })
}

fn new_shutdown_signal(
    done_rx: tokio::sync::oneshot::Receiver<()>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        tokio::select! {
            _ = base_shutdown_signal => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            _ = done_rx => {
                tracing::debug!("load loop is finished, return control");
            }
        }
    }
}
