use std::path::Path;

use rama::{
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    net::tls::{
        ApplicationProtocol, DataEncoding,
        server::{ServerAuth, ServerAuthData, ServerConfig},
    },
    telemetry::tracing,
    tls::boring::{
        core::{pkey::PKey, x509::X509},
        server::{TlsAcceptorData, TlsAcceptorLayer},
    },
    utils::str::NonEmptyStr,
};

use secrecy::{ExposeSecret as _, SecretBox};

/// The identity of the echo server: a PEM certificate chain
/// and its PEM private key, as found in the certificate store.
pub struct ServerIdentity {
    crt: NonEmptyStr,
    key: SecretBox<String>,
}

impl std::fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerIdentity").finish_non_exhaustive()
    }
}

impl ServerIdentity {
    /// Load (and validate) the certificate chain and private key.
    ///
    /// Any failure is returned as an error naming the offending file,
    /// as the server cannot operate without a valid identity.
    pub async fn try_load(crt_path: &Path, key_path: &Path) -> Result<Self, BoxError> {
        let crt = tokio::fs::read_to_string(crt_path)
            .await
            .context("read server certificate (chain) PEM file")
            .with_context_debug_field("path", || crt_path.to_owned())?;
        let key = SecretBox::new(Box::new(
            tokio::fs::read_to_string(key_path)
                .await
                .context("read server private key PEM file")
                .with_context_debug_field("path", || key_path.to_owned())?,
        ));

        let identity = Self::try_from_pem(crt, key)
            .with_context_debug_field("crt_path", || crt_path.to_owned())
            .with_context_debug_field("key_path", || key_path.to_owned())?;

        tracing::info!(
            crt.path = ?crt_path,
            key.path = ?key_path,
            "server identity loaded from certificate store",
        );
        Ok(identity)
    }

    fn try_from_pem(crt: String, key: SecretBox<String>) -> Result<Self, BoxError> {
        let chain = X509::stack_from_pem(crt.as_bytes()).context("parse PEM certificate chain")?;
        if chain.is_empty() {
            return Err(BoxError::from("PEM certificate file contains no certificates"));
        }
        PKey::private_key_from_pem(key.expose_secret().as_bytes())
            .context("parse PEM private key")?;

        let crt = crt
            .try_into()
            .context("PEM certificate string as NonEmpty variant")?;

        Ok(Self { crt, key })
    }

    /// Consume this identity into a TLS acceptor layer.
    ///
    /// Only HTTP/1.1 is offered via ALPN,
    /// as the echo server closes the connection after each response.
    pub fn try_into_acceptor_layer(self) -> Result<TlsAcceptorLayer, BoxError> {
        let key: NonEmptyStr = self
            .key
            .expose_secret()
            .as_str()
            .try_into()
            .context("PEM private key string as NonEmpty variant")?;

        let tls_acceptor_data: TlsAcceptorData = ServerConfig {
            application_layer_protocol_negotiation: Some(vec![ApplicationProtocol::HTTP_11]),
            ..ServerConfig::new(ServerAuth::Single(ServerAuthData {
                private_key: DataEncoding::Pem(key),
                cert_chain: DataEncoding::Pem(self.crt),
                ocsp: None,
            }))
        }
        .try_into()
        .context("create tls acceptor data")?;

        Ok(TlsAcceptorLayer::new(tls_acceptor_data))
    }
}

#[cfg(any(test, feature = "test-utils"))]
/// Generate a self-signed (`localhost`) certificate and its key, both PEM encoded.
pub fn self_signed_pem_pair() -> Result<(String, String), BoxError> {
    use rama::{
        net::{address::Domain, tls::server::SelfSignedData},
        tls::boring::server::utils::self_signed_server_ca,
    };

    let (crt, key) = self_signed_server_ca(&SelfSignedData {
        organisation_name: Some("echo harness test server".to_owned()),
        common_name: Some(Domain::from_static("localhost")),
        subject_alternative_names: None,
    })
    .context("generate self signed TLS crt")?;

    let crt = String::from_utf8(crt.to_pem().context("generate PEM crt byte slice")?)
        .context("PEM crt byte slice as String")?;
    let key = String::from_utf8(
        key.private_key_to_pem_pkcs8()
            .context("generate PEM key byte slice")?,
    )
    .context("PEM key byte slice as String")?;

    Ok((crt, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::utils::io::tmp_dir;

    async fn write_pair(dir: &Path, crt: &str, key: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let crt_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        tokio::fs::write(&crt_path, crt).await.unwrap();
        tokio::fs::write(&key_path, key).await.unwrap();
        (crt_path, key_path)
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_load_self_signed_identity() {
        let dir = tmp_dir::try_new("test_load_self_signed_identity").unwrap();
        let (crt, key) = self_signed_pem_pair().unwrap();
        let (crt_path, key_path) = write_pair(&dir, &crt, &key).await;

        let identity = ServerIdentity::try_load(&crt_path, &key_path).await.unwrap();
        let _ = identity.try_into_acceptor_layer().unwrap();
    }

    #[tokio::test]
    async fn test_load_identity_missing_files() {
        let dir = tmp_dir::try_new("test_load_identity_missing_files").unwrap();
        let err = ServerIdentity::try_load(&dir.join("cert.pem"), &dir.join("key.pem"))
            .await
            .unwrap_err();
        let msg = format!("{err} {err:?}");
        assert!(msg.contains("cert.pem"), "{msg}");
    }

    #[tokio::test]
    async fn test_load_identity_invalid_pem() {
        let dir = tmp_dir::try_new("test_load_identity_invalid_pem").unwrap();
        let (crt, key) = self_signed_pem_pair().unwrap();

        let (crt_path, key_path) = write_pair(&dir, "not a certificate", &key).await;
        assert!(ServerIdentity::try_load(&crt_path, &key_path).await.is_err());

        let (crt_path, key_path) = write_pair(&dir, &crt, "not a key").await;
        assert!(ServerIdentity::try_load(&crt_path, &key_path).await.is_err());

        let (crt_path, key_path) = write_pair(&dir, "", &key).await;
        assert!(ServerIdentity::try_load(&crt_path, &key_path).await.is_err());
    }
}
