//! HTTP server assembly.

pub mod app;

pub use app::{build_app, shutdown_signal, AppState};
