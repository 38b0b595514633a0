use std::{fmt, sync::Arc};

use rama::{
    net::tls::client::ServerVerifyMode,
    tls::boring::{
        client::TlsConnectorDataBuilder,
        core::{ssl::SslVersion, x509::store::X509Store},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

impl TlsVersion {
    fn as_ssl_version(self) -> SslVersion {
        match self {
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsVersion::Tls12 => write!(f, "TLSv1.2"),
            TlsVersion::Tls13 => write!(f, "TLSv1.3"),
        }
    }
}

/// How the client treats the certificate presented by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertVerification {
    /// Accept any certificate, including self-signed ones,
    /// without checking the hostname.
    AcceptAny,
    /// Verify the certificate chain against the trust store
    /// and the certificate against the requested hostname.
    VerifyPeer,
}

/// Client side TLS policy, immutable for the lifetime of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsPolicy {
    pub verification: CertVerification,
    pub min_version: Option<TlsVersion>,
    pub max_version: Option<TlsVersion>,
}

impl TlsPolicy {
    pub const INSECURE_ANY: Self = Self {
        verification: CertVerification::AcceptAny,
        min_version: None,
        max_version: None,
    };

    pub const VERIFY_PEER: Self = Self {
        verification: CertVerification::VerifyPeer,
        min_version: None,
        max_version: None,
    };

    #[inline(always)]
    pub fn checks_hostname(&self) -> bool {
        self.verification == CertVerification::VerifyPeer
    }

    /// Create the boring connector config for this policy.
    ///
    /// The trust store is only used for [`CertVerification::VerifyPeer`],
    /// and when absent the default (system) trust store is used instead.
    pub fn new_connector_data(
        &self,
        trust_store: Option<Arc<X509Store>>,
    ) -> Arc<TlsConnectorDataBuilder> {
        let mut builder = TlsConnectorDataBuilder::new_http_auto();

        builder = match (self.verification, trust_store) {
            (CertVerification::AcceptAny, _) => {
                builder.with_server_verify_mode(ServerVerifyMode::Disable)
            }
            (CertVerification::VerifyPeer, Some(store)) => {
                builder.with_server_verify_cert_store(store)
            }
            (CertVerification::VerifyPeer, None) => builder,
        };

        if let Some(version) = self.min_version {
            builder = builder.with_min_ssl_version(version.as_ssl_version());
        }
        if let Some(version) = self.max_version {
            builder = builder.with_max_ssl_version(version.as_ssl_version());
        }

        Arc::new(builder)
    }
}

impl fmt::Display for TlsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verification {
            CertVerification::AcceptAny => write!(f, "accept-any")?,
            CertVerification::VerifyPeer => write!(f, "verify-peer")?,
        }
        if let Some(version) = self.min_version {
            write!(f, " min={version}")?;
        }
        if let Some(version) = self.max_version {
            write!(f, " max={version}")?;
        }
        Ok(())
    }
}
