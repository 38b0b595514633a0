//! Library for the echo harness containing the code shared
//! between the load client and the echo server.
//!
//! Both binaries are thin shells around this crate, which allows
//! the e2e test suites to drive a real server and a real client
//! from within the same process.

#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod client;
pub mod http;
pub mod payload;
pub mod server;
pub mod tls;
pub mod utils;
