//! LearnHub client core - session, cache, and creation-workflow layer.
//!
//! This crate contains the non-visual plumbing of the LearnHub marketplace
//! client: the authenticated HTTP pipeline with transparent credential
//! refresh, the TTL response cache backing frequently-polled data, and the
//! sequential course-creation workflow.
//!
//! Rendering, routing, and form handling live in the application crates and
//! consume this one through `SessionClient`, `CourseService`, and
//! `CreationSaga`.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod courses;
pub mod models;
pub mod workflow;

use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use api::{ApiError, HttpTransport, SessionClient, Transport};
pub use auth::{Credential, SessionStore};
pub use cache::ResponseCache;
pub use config::ClientConfig;
pub use courses::CourseService;
pub use workflow::{CreationError, CreationReport, CreationSaga, SagaOutcome};

/// Initialize the tracing subscriber for logging.
///
/// Use the RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
/// Host applications call this once at startup.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}
