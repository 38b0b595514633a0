use std::collections::HashMap;

use rama::error::{BoxError, ErrorContext as _, ErrorExt as _};

use echo_harness_lib::{client::Target, tls::Scenario, utils::env};

pub const ENV_VAR_PORT: &str = "PORT";

/// The echo server target for each configured scenario.
///
/// All scenarios share the same port, but each of them
/// reads its host from its own environment variable.
#[derive(Debug, Clone)]
pub struct Targets {
    targets: HashMap<Scenario, Target>,
}

impl Targets {
    /// Resolve the targets of all given scenarios from the process environment.
    pub fn try_from_env(scenarios: &[Scenario]) -> Result<Self, BoxError> {
        Self::try_from_lookup(scenarios, env::required_var)
    }

    pub fn try_from_lookup<F>(scenarios: &[Scenario], lookup: F) -> Result<Self, BoxError>
    where
        F: Fn(&'static str) -> Result<String, BoxError>,
    {
        let raw_port = lookup(ENV_VAR_PORT)?;
        let port: u16 = raw_port.trim().parse().map_err(|err| {
            BoxError::from(format!("parse port: {err}"))
                .context_field("name", ENV_VAR_PORT)
                .context_field("value", raw_port.clone())
        })?;

        let mut targets = HashMap::with_capacity(scenarios.len());
        for &scenario in scenarios {
            let host = lookup(scenario.host_env_var())
                .context("resolve scenario target host")
                .context_field("scenario", scenario)?;
            targets.insert(scenario, Target { host, port });
        }

        Ok(Self { targets })
    }

    pub fn get(&self, scenario: Scenario) -> Option<&Target> {
        self.targets.get(&scenario)
    }
}
