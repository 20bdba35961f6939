//! Network client for the Units-Hub offline worker.
//!
//! This crate provides the HTTP fetch pipeline and the `NetworkFetch`
//! trait seam the strategy layer depends on.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, NetworkFetch};
