//! Authentication state for the client.
//!
//! This module provides:
//! - `Credential`: the opaque bearer token presented with each request
//! - `SessionStore`: owner of the current credential, persisted to disk
//!
//! The store is constructed once at app start and handed to `SessionClient`,
//! which is the only component that mutates it afterwards (refresh success,
//! refresh failure, logout).

pub mod session;

pub use session::{Credential, SessionStore};
