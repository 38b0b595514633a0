use std::fmt;

use super::{CertVerification, TlsPolicy, TlsVersion};

/// Named TLS configurations the load client can run with.
///
/// Each scenario targets the host found in its own environment variable,
/// which allows a single client to alternate between servers
/// that are set up for a specific TLS version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Default)]
pub enum Scenario {
    /// Accept any server certificate, no hostname check.
    #[default]
    InsecureAny,

    /// Like insecure-any, but never negotiate anything above TLS 1.2.
    #[value(name = "pinned-max-tls12")]
    PinnedMaxTls12,

    /// Like insecure-any, but never negotiate anything below TLS 1.3.
    #[value(name = "pinned-min-tls13")]
    PinnedMinTls13,

    /// Verify the server certificate chain and hostname.
    VerifyPeer,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::InsecureAny,
        Scenario::PinnedMaxTls12,
        Scenario::PinnedMinTls13,
        Scenario::VerifyPeer,
    ];

    pub fn policy(self) -> TlsPolicy {
        match self {
            Scenario::InsecureAny => TlsPolicy::INSECURE_ANY,
            Scenario::PinnedMaxTls12 => TlsPolicy {
                verification: CertVerification::AcceptAny,
                min_version: None,
                max_version: Some(TlsVersion::Tls12),
            },
            Scenario::PinnedMinTls13 => TlsPolicy {
                verification: CertVerification::AcceptAny,
                min_version: Some(TlsVersion::Tls13),
                max_version: None,
            },
            Scenario::VerifyPeer => TlsPolicy::VERIFY_PEER,
        }
    }

    /// Name of the environment variable holding the target host.
    pub fn host_env_var(self) -> &'static str {
        match self {
            Scenario::InsecureAny | Scenario::VerifyPeer => "HOST",
            Scenario::PinnedMaxTls12 => "HOST_TLS12",
            Scenario::PinnedMinTls13 => "HOST_TLS13",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::InsecureAny => "insecure-any",
            Scenario::PinnedMaxTls12 => "pinned-max-tls12",
            Scenario::PinnedMinTls13 => "pinned-min-tls13",
            Scenario::VerifyPeer => "verify-peer",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
