//! TTL response cache.
//!
//! Avoids redundant round-trips for frequently-polled data (enrollments).
//! Entries expire lazily on read and can be invalidated explicitly, singly
//! or by key-family prefix, whenever the underlying resource is mutated.

pub mod store;

pub use store::{CacheEntry, ResponseCache};
