use std::{borrow::Cow, fmt, time::Duration};

pub const QUERY_KEY_SIZE: &str = "size";
pub const QUERY_KEY_SLEEP: &str = "sleep";

pub const DEFAULT_SIZE: u64 = 1;
pub const DEFAULT_SLEEP: u64 = 0;

/// What an echo request asks of the server:
/// respond with `size` random letters after `sleep` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct EchoParams {
    pub size: u64,
    pub sleep: u64,
}

impl Default for EchoParams {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            sleep: DEFAULT_SLEEP,
        }
    }
}

/// Server side bounds for the (untrusted) echo parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoLimits {
    pub max_size: u64,
    pub max_sleep: u64,
}

impl EchoLimits {
    pub const DEFAULT_MAX_SIZE: u64 = 1024 * 1024;
    pub const DEFAULT_MAX_SLEEP: u64 = 60;
}

impl Default for EchoLimits {
    fn default() -> Self {
        Self {
            max_size: Self::DEFAULT_MAX_SIZE,
            max_sleep: Self::DEFAULT_MAX_SLEEP,
        }
    }
}

impl EchoParams {
    /// Parse the echo parameters from an (optional) uri query string.
    ///
    /// - the first occurrence of a key wins;
    /// - keys with a blank value are treated as absent;
    /// - absent keys fall back to their default (`size=1`, `sleep=0`);
    /// - unknown keys are ignored.
    ///
    /// Values which are not a non-negative integer,
    /// or which exceed the given limits, are rejected.
    pub fn try_from_query(
        query: Option<&str>,
        limits: &EchoLimits,
    ) -> Result<Self, EchoQueryError> {
        let mut size: Option<Cow<'_, str>> = None;
        let mut sleep: Option<Cow<'_, str>> = None;

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            let pairs: Vec<(Cow<'_, str>, Cow<'_, str>)> =
                serde_html_form::from_str(query).map_err(|_| EchoQueryError::InvalidQuery)?;

            for (key, value) in pairs {
                if value.trim().is_empty() {
                    continue;
                }
                let slot = match key.as_ref() {
                    QUERY_KEY_SIZE => &mut size,
                    QUERY_KEY_SLEEP => &mut sleep,
                    _ => continue,
                };
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
        }

        let size = match size {
            Some(raw) => parse_bounded(QUERY_KEY_SIZE, &raw, limits.max_size)?,
            None => DEFAULT_SIZE,
        };
        let sleep = match sleep {
            Some(raw) => parse_bounded(QUERY_KEY_SLEEP, &raw, limits.max_sleep)?,
            None => DEFAULT_SLEEP,
        };

        Ok(Self { size, sleep })
    }

    #[inline(always)]
    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep)
    }

    /// Encode these parameters as a query string (without leading `?`).
    pub fn to_query_string(&self) -> String {
        format!(
            "{QUERY_KEY_SIZE}={}&{QUERY_KEY_SLEEP}={}",
            self.size, self.sleep
        )
    }
}

fn parse_bounded(key: &'static str, raw: &str, max: u64) -> Result<u64, EchoQueryError> {
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| EchoQueryError::InvalidNumber {
            key,
            value: raw.to_owned(),
        })?;

    if value > max {
        return Err(EchoQueryError::OutOfRange { key, value, max });
    }

    Ok(value)
}

#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum EchoQueryError {
    InvalidQuery,
    InvalidNumber {
        key: &'static str,
        value: String,
    },
    OutOfRange {
        key: &'static str,
        value: u64,
        max: u64,
    },
}

impl fmt::Display for EchoQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoQueryError::InvalidQuery => write!(f, "EchoQueryError: invalid query string"),
            EchoQueryError::InvalidNumber { key, value } => write!(
                f,
                "EchoQueryError: '{key}' is not a non-negative integer: {value:?}"
            ),
            EchoQueryError::OutOfRange { key, value, max } => write!(
                f,
                "EchoQueryError: '{key}' value {value} exceeds maximum of {max}"
            ),
        }
    }
}

impl std::error::Error for EchoQueryError {}
