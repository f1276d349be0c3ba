//! Formula Bridge API server module
//!
//! HTTP REST API over a formula session.
//! Run with `fbridge serve` or `fbridge-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, AppState};
