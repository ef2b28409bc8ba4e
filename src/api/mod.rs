//! REST API layer for the LearnHub marketplace.
//!
//! This module provides the `SessionClient` pipeline (bearer attach,
//! refresh-once-and-retry), the `Transport` seam it runs over, and the typed
//! `ApiError` taxonomy surfaced to callers.

pub mod client;
pub mod error;
pub mod transport;

pub use client::SessionClient;
pub use error::ApiError;
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
