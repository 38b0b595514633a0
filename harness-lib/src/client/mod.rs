//! centralized (web) client creation
//!
//! Every load request is sent by a freshly created client,
//! configured for the [`TlsPolicy`] of the scenario picked for
//! that request. Combined with the `Connection: close` header
//! this guarantees that no connection is reused across iterations.

use std::{sync::Arc, time::Duration};

use rama::{
    Layer as _, Service,
    error::{BoxError, ErrorContext as _},
    http::{Request, Response, StatusCode, body::util::BodyExt as _, client::EasyHttpWebClient},
    layer::MapErrLayer,
    rt::Executor,
    tls::boring::core::x509::store::X509Store,
};

use crate::tls::TlsPolicy;

mod request;

pub use self::request::{LoadRequest, LoadShape, Target};

/// Create a new web client that applies the given TLS policy.
///
/// No connection pool is used: each request dials a new connection.
pub fn new_web_client(
    policy: &TlsPolicy,
    trust_store: Option<Arc<X509Store>>,
) -> Result<impl Service<Request, Output = Response, Error = BoxError> + Clone, BoxError> {
    let tls_config = policy.new_connector_data(trust_store);

    let inner_https_client = EasyHttpWebClient::connector_builder()
        .with_default_transport_connector()
        .without_tls_proxy_support()
        .without_proxy_support()
        .with_tls_support_using_boringssl(Some(tls_config))
        .with_default_http_connector(Executor::default())
        .build_client();

    Ok(MapErrLayer::new(Into::<BoxError>::into).into_layer(inner_https_client))
}

/// What the load client observed for one request.
#[derive(Debug, Clone)]
pub struct LoadResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Send the load request and read its response fully.
///
/// The optional timeout covers the entire exchange, body included.
pub async fn send_load_request<S>(
    client: &S,
    req: LoadRequest,
    timeout: Option<Duration>,
) -> Result<LoadResponse, BoxError>
where
    S: Service<Request, Output = Response, Error = BoxError>,
{
    let exchange = async {
        let http_req = req.try_into_http_request()?;
        let resp = client.serve(http_req).await.context("send load request")?;
        let status = resp.status();
        let payload = resp
            .into_body()
            .collect()
            .await
            .context("read load response body")?
            .to_bytes();
        // printed as-is, a non utf-8 body is not an error for the harness
        let body = String::from_utf8_lossy(&payload).into_owned();
        Ok::<_, BoxError>(LoadResponse { status, body })
    };

    match timeout {
        Some(duration) => tokio::time::timeout(duration, exchange)
            .await
            .context("load request timed out")?,
        None => exchange.await,
    }
}
