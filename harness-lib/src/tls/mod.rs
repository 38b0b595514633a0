//! TLS configuration for both sides of the harness.
//!
//! - the client picks a [`Scenario`] per request, each scenario
//!   being a named, immutable [`TlsPolicy`];
//! - the server loads its identity (crt chain + key) from the
//!   certificate store (two PEM files) once at startup.

mod identity;
mod policy;
mod scenario;
mod trust;

pub use self::{
    identity::ServerIdentity,
    policy::{CertVerification, TlsPolicy, TlsVersion},
    scenario::Scenario,
    trust::try_load_trust_store,
};

#[cfg(any(test, feature = "test-utils"))]
pub use self::identity::self_signed_pem_pair;
