//! The HTTPS echo server.

use std::{path::Path, path::PathBuf, sync::Arc, time::Duration};

use rama::{
    Layer,
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    graceful::ShutdownGuard,
    http::{
        HeaderValue,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
    },
    layer::TimeoutLayer,
    net::{address::SocketAddress, socket::Interface, stream::layer::http::BodyLimitLayer},
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
    tls::boring::server::TlsAcceptorLayer,
};

use crate::{http::EchoLimits, utils::env::network_service_identifier};

mod echo;
pub use echo::EchoService;

/// Grace period on top of the max sleep a single connection is allowed to take.
const CONNECTION_TIMEOUT_MARGIN: Duration = Duration::from_secs(60);

/// Default (symmetric) body limit for a single connection.
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct EchoServerConfig {
    pub bind: Interface,
    pub limits: EchoLimits,
    pub body_limit: usize,
    /// directory to write the bound address (`echo.addr.txt`) into
    pub data: Option<PathBuf>,
}

impl EchoServerConfig {
    pub fn new(bind: Interface) -> Self {
        Self {
            bind,
            limits: EchoLimits::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            data: None,
        }
    }

    fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.max_sleep) + CONNECTION_TIMEOUT_MARGIN
    }
}

/// Serve the echo service over TLS until the guard's shutdown is triggered.
///
/// Every accepted connection is handled in its own task,
/// such that a sleeping request never blocks any other.
pub async fn run_echo_https_server(
    cfg: EchoServerConfig,
    guard: ShutdownGuard,
    tls_acceptor: TlsAcceptorLayer,
    addr_tx: Option<tokio::sync::oneshot::Sender<SocketAddress>>,
) -> Result<(), BoxError> {
    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(network_service_identifier())),
    )
        .into_layer(EchoService::new(cfg.limits));

    let exec = Executor::graceful(guard.clone());
    let http_server = HttpServer::auto(exec.clone()).service(Arc::new(http_svc));

    let body_limit = cfg
        .body_limit
        .max(usize::try_from(cfg.limits.max_size).unwrap_or(usize::MAX));
    let tcp_svc = (
        TimeoutLayer::new(cfg.connection_timeout()),
        BodyLimitLayer::symmetric(body_limit),
        tls_acceptor,
    )
        .into_layer(http_server);

    let tcp_listener = TcpListener::bind(cfg.bind.clone(), exec)
        .await
        .context("bind echo https server")?;

    let echo_addr = tcp_listener
        .local_addr()
        .context("get bound address for echo https server")?;

    tracing::info!(
        server.address = %echo_addr,
        echo.max_size = cfg.limits.max_size,
        echo.max_sleep = cfg.limits.max_sleep,
        "echo https server ready"
    );

    if let Some(ref dir) = cfg.data {
        write_server_socket_address_as_file(dir, "echo", echo_addr.into()).await?;
    }
    if let Some(tx) = addr_tx
        && tx.send(echo_addr.into()).is_err()
    {
        return Err(BoxError::from("failed to send echo server address")
            .context_field("address", echo_addr));
    }

    tcp_listener.serve(tcp_svc).await;

    Ok(())
}

pub async fn write_server_socket_address_as_file(
    dir: &Path,
    name: &str,
    addr: SocketAddress,
) -> Result<(), BoxError> {
    let path = dir.join(format!("{name}.addr.txt"));
    tokio::fs::write(&path, addr.to_string())
        .await
        .context("write server's socket address to file")
        .context_field("address", addr)
        .with_context_debug_field("path", || path.to_owned())
}
