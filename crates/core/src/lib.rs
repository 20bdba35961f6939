//! Core types and shared functionality for the Units-Hub offline worker.
//!
//! This crate provides:
//! - Partitioned cache store with SQLite backend
//! - Request identity and strategy classification
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod strategy;

pub use cache::{CacheDb, CachedEntry};
pub use config::AppConfig;
pub use error::Error;
pub use request::ResourceRequest;
pub use strategy::{PartitionKind, Strategy};
