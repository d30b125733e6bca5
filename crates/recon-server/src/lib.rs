//! Thin `axum` HTTP surface over `reconcile_core`. Every handler
//! delegates to the orchestrator or reporting module; no matching or
//! scoring logic lives in this crate.

pub mod error;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
