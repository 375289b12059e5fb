//! cors-watcher - CORS misconfiguration scanner
//!
//! Sends a target endpoint a battery of crafted `Origin` headers and tags
//! every answer with what it reveals about the server's CORS policy:
//! wildcard or reflected origins, credentialed access, plain-text origins
//! and cache poisoning risks.

pub mod config;
pub mod error;
pub mod http;
pub mod input;
pub mod models;
pub mod report;
pub mod scanner;
pub mod validator;
