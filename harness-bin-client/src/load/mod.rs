//! The load loop: one request at a time, forever or for a fixed
//! amount of iterations, each with a freshly picked scenario.

use std::{sync::Arc, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    graceful::ShutdownGuard,
    telemetry::tracing,
    tls::boring::core::x509::store::X509Store,
};
use rand::seq::IndexedRandom as _;

use echo_harness_lib::{
    client::{LoadRequest, LoadResponse, LoadShape, new_web_client, send_load_request},
    tls::Scenario,
};

mod target;

pub use self::target::Targets;

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub scenarios: Vec<Scenario>,
    pub targets: Targets,
    pub shape: LoadShape,
    pub trust_store: Option<Arc<X509Store>>,
    pub interval: Duration,
    pub timeout: Option<Duration>,
    /// `None` runs until shutdown
    pub iterations: Option<u64>,
}

/// Tally of the finished iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ok: u64,
    pub failed: u64,
}

impl LoopSummary {
    #[inline(always)]
    pub fn total(&self) -> u64 {
        self.ok + self.failed
    }
}

/// Run the load loop until the configured iterations
/// are done or the guard's shutdown is triggered.
///
/// A failed iteration is printed and counted,
/// but never ends the loop.
pub async fn run_load_loop(cfg: LoadConfig, guard: ShutdownGuard) -> LoopSummary {
    let mut summary = LoopSummary::default();
    let mut cancelled = std::pin::pin!(guard.clone_weak().into_cancelled());

    loop {
        if cfg.iterations.is_some_and(|max| summary.total() >= max) {
            tracing::debug!(?summary, "load loop done: iterations reached");
            return summary;
        }

        let (scenario, req) = match next_request(&cfg) {
            Ok(next) => next,
            Err(err) => {
                // targets are resolved upfront for all configured scenarios
                tracing::error!("failed to prepare load request: {err}");
                return summary;
            }
        };
        let payload = String::from_utf8_lossy(&req.payload).into_owned();

        tracing::debug!(
            %scenario,
            uri = %req.uri(),
            payload.size = req.payload.len(),
            "send load request",
        );

        let result = tokio::select! {
            _ = cancelled.as_mut() => {
                tracing::debug!(?summary, "exit load loop early: guard shutdown");
                return summary;
            }
            result = run_iteration(&cfg, scenario, req) => result,
        };

        match result {
            Ok(ref resp) => {
                tracing::debug!(
                    %scenario,
                    http.response.status_code = resp.status.as_u16(),
                    "load request finished",
                );
                summary.ok += 1;
            }
            Err(ref err) => {
                tracing::debug!(%scenario, "load request failed: {err}");
                summary.failed += 1;
            }
        }
        print_outcome(&payload, &result);

        if cfg.iterations.is_some_and(|max| summary.total() >= max) {
            continue;
        }

        tokio::select! {
            _ = cancelled.as_mut() => {
                tracing::debug!(?summary, "exit load loop early: guard shutdown");
                return summary;
            }
            _ = tokio::time::sleep(cfg.interval) => (),
        }
    }
}

fn next_request(cfg: &LoadConfig) -> Result<(Scenario, LoadRequest), BoxError> {
    let mut rng = rand::rng();

    let scenario = cfg
        .scenarios
        .choose(&mut rng)
        .copied()
        .unwrap_or_default();
    let target = cfg.targets.get(scenario).cloned().ok_or_else(|| {
        BoxError::from("no target resolved for scenario").context_field("scenario", scenario)
    })?;

    Ok((
        scenario,
        LoadRequest::random_with_rng(&mut rng, target, &cfg.shape),
    ))
}

async fn run_iteration(
    cfg: &LoadConfig,
    scenario: Scenario,
    req: LoadRequest,
) -> Result<LoadResponse, BoxError> {
    let client = new_web_client(&scenario.policy(), cfg.trust_store.clone())
        .context("create load web client")
        .context_field("scenario", scenario)?;
    send_load_request(&client, req, cfg.timeout).await
}

#[allow(clippy::print_stdout)]
fn print_outcome(payload: &str, result: &Result<LoadResponse, BoxError>) {
    match result {
        Ok(resp) => println!(
            "req - {payload} \nresp\n status - {}\n body - {}",
            resp.status.as_u16(),
            resp.body
        ),
        Err(err) => println!("req - {payload} \nerror - {err}"),
    }
}
