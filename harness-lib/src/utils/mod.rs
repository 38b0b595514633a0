pub mod env;
pub mod io;
pub mod log;
pub mod telemetry;

#[cfg(target_family = "unix")]
pub mod os;
