//! Remote task store access
//!
//! The store is the authoritative holder of lists and tasks. Everything here
//! is one request, one response; reconciling the answer into the local forest
//! is the board controller's job.

pub mod client;
mod error;
mod http;

pub use client::TaskStore;
pub use error::StoreError;
pub use http::HttpTaskStore;
