pub mod echo;
pub mod query;

pub use self::query::{EchoLimits, EchoParams, EchoQueryError};
