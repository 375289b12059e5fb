//! HTTP transport for cors-watcher

pub mod client;
pub use client::{HttpClient, RawResponse, Transport};
