use std::{fmt, ops::Range};

use rama::{
    error::{BoxError, ErrorContext as _},
    http::{Body, HeaderValue, Method, Request, header::CONNECTION},
};
use rand::{Rng, distr::uniform::SampleUniform};

use crate::{http::EchoParams, payload};

/// Host and port of the echo server targeted by the load client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            // ipv6 literal
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Ranges from which the random parts of a [`LoadRequest`] are drawn.
///
/// All ranges are half-open; an empty range always yields its start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadShape {
    pub size: Range<u64>,
    pub sleep: Range<u64>,
    pub payload_len: Range<usize>,
}

impl Default for LoadShape {
    fn default() -> Self {
        Self {
            size: 0..100,
            sleep: 0..3,
            payload_len: 100..10_000,
        }
    }
}

/// A single request of the load client, constructed fresh per iteration.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub target: Target,
    pub params: EchoParams,
    pub payload: Vec<u8>,
}

impl LoadRequest {
    pub fn random_with_rng<R: Rng + ?Sized>(rng: &mut R, target: Target, shape: &LoadShape) -> Self {
        let params = EchoParams {
            size: pick(rng, &shape.size),
            sleep: pick(rng, &shape.sleep),
        };
        let payload = payload::random_payload_with_rng(rng, shape.payload_len.clone());
        Self {
            target,
            params,
            payload,
        }
    }

    pub fn uri(&self) -> String {
        format!("https://{}/?{}", self.target, self.params.to_query_string())
    }

    /// Create the `POST` request, which asks the server
    /// to close the connection once it responded.
    pub fn try_into_http_request(self) -> Result<Request, BoxError> {
        let uri = self.uri();
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONNECTION, HeaderValue::from_static("close"))
            .body(Body::from(self.payload))
            .context("build load request")
    }
}

fn pick<R, T>(rng: &mut R, range: &Range<T>) -> T
where
    R: Rng + ?Sized,
    T: SampleUniform + PartialOrd + Copy,
{
    if range.start < range.end {
        rng.random_range(range.start..range.end)
    } else {
        range.start
    }
}
