use std::{path::Path, sync::Arc};

use rama::{
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    telemetry::tracing,
    tls::boring::core::x509::{
        X509,
        store::{X509Store, X509StoreBuilder},
    },
};

/// Create a trust store holding the default (system) trust anchors
/// extended with all PEM certificates found in the file at `path`,
/// for use with [`super::CertVerification::VerifyPeer`].
pub async fn try_load_trust_store(path: &Path) -> Result<Arc<X509Store>, BoxError> {
    let pem = tokio::fs::read(path)
        .await
        .context("read trust store PEM file")
        .with_context_debug_field("path", || path.to_owned())?;

    let certs = X509::stack_from_pem(&pem)
        .context("parse trust store PEM certificates")
        .with_context_debug_field("path", || path.to_owned())?;
    if certs.is_empty() {
        return Err(BoxError::from("trust store PEM file contains no certificates")
            .context_debug_field("path", path.to_owned()));
    }

    let mut store_builder = X509StoreBuilder::new().context("create x509 store builder")?;
    store_builder
        .set_default_paths()
        .context("load default trust anchors")?;
    let cert_count = certs.len();
    for cert in certs {
        store_builder
            .add_cert(cert)
            .context("add certificate to trust store")?;
    }

    tracing::debug!(path = ?path, %cert_count, "trust store loaded");
    Ok(Arc::new(store_builder.build()))
}
