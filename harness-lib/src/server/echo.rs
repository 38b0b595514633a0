use std::{convert::Infallible, time::SystemTime};

use rama::{
    Service,
    extensions::ExtensionsRef as _,
    http::{Method, Request, Response, StatusCode, body::util::BodyExt as _},
    net::{address::SocketAddress, stream::SocketInfo},
    telemetry::tracing,
};

use crate::{
    http::{
        EchoLimits, EchoParams,
        echo::{echo_response, error_response},
    },
    utils::log::escape_control_chars,
};

/// The echo http service.
///
/// Each request is served independently: the only state is the
/// (immutable) limits, so a sleeping request never holds up any other.
#[derive(Debug, Clone)]
pub struct EchoService {
    limits: EchoLimits,
}

impl EchoService {
    pub fn new(limits: EchoLimits) -> Self {
        Self { limits }
    }

    async fn respond(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();

        let params = if parts.method != Method::POST {
            Err(error_response(
                StatusCode::NOT_IMPLEMENTED,
                format!("unsupported method ({})", parts.method),
            ))
        } else {
            EchoParams::try_from_query(parts.uri.query(), &self.limits).map_err(|err| {
                tracing::debug!(uri = %parts.uri, "reject echo request: {err}");
                error_response(StatusCode::BAD_REQUEST, err.to_string())
            })
        };

        // drain the upload (also for rejected requests),
        // so the client can finish writing before we close
        match body.collect().await {
            Ok(collected) => {
                tracing::trace!(
                    http.request.body.size = collected.to_bytes().len(),
                    "echo request payload received"
                );
            }
            Err(err) => {
                tracing::debug!("failed to read echo request payload: {err}");
                return error_response(StatusCode::BAD_REQUEST, "failed to read request body");
            }
        }

        let params = match params {
            Ok(params) => params,
            Err(resp) => return resp,
        };

        if params.sleep > 0 {
            tokio::time::sleep(params.sleep_duration()).await;
        }

        echo_response(&params)
    }
}

impl Service<Request> for EchoService {
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        let peer_addr = req
            .extensions()
            .get::<SocketInfo>()
            .map(|info| SocketAddress::from(*info.peer_addr()));
        let request_line = format!("{} {} {:?}", req.method(), req.uri(), req.version());

        let resp = self.respond(req).await;

        log_request(peer_addr, &request_line, &resp);
        Ok(resp)
    }
}

/// Log one line per served request.
///
/// The request line is client controlled and
/// therefore has its control characters escaped.
fn log_request(peer_addr: Option<SocketAddress>, request_line: &str, resp: &Response) {
    let message = format_request_log_message(request_line, resp);
    let message = escape_control_chars(&message);
    let timestamp = humantime::format_rfc3339_seconds(SystemTime::now());

    match peer_addr {
        Some(addr) => tracing::info!(
            client.address = %addr.ip_addr,
            client.port = addr.port,
            client.address_string = %address_string(&addr),
            %timestamp,
            "{message}",
        ),
        None => tracing::info!(%timestamp, "{message}"),
    }
}

fn format_request_log_message(request_line: &str, resp: &Response) -> String {
    let size = resp
        .headers()
        .get(rama::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    format!("\"{request_line}\" {} {size}", resp.status().as_u16())
}

/// Host part of the client address as shown in the request log.
///
/// No reverse DNS lookup is performed, to keep
/// the worker free from any blocking or remote dependency.
fn address_string(addr: &SocketAddress) -> String {
    addr.ip_addr.to_string()
}
