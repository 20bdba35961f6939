//! SQLite-backed partitioned cache store.
//!
//! This module provides the persistent key-value cache primitive the
//! offline worker builds on, using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Named partitions with idempotent creation and whole-partition deletion
//! - Entries keyed by request identity, kept in insertion order
//! - WAL mode for concurrent access
//! - Oldest-first size bounding and age-based expiry sweeps

pub mod connection;
pub mod entries;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedEntry;
