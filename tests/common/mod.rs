//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use cors_watcher::error::{Result, TransactionError};
use cors_watcher::http::{RawResponse, Transport};
use cors_watcher::models::{Batch, BaseRequest, Transaction, WatchConfig};
use cors_watcher::report::OutputSink;
use std::sync::{Arc, Mutex};

/// What a sink was told, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Header(String),
    Row(String),
    Complete(usize),
}

/// Sink recording every call, shareable with the test body
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn rows(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Row(origin) => Some(origin),
                _ => None,
            })
            .collect()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl OutputSink for RecordingSink {
    fn batch_header(&mut self, request: &BaseRequest) {
        self.push(Event::Header(request.url.clone()));
    }

    fn transaction_row(&mut self, transaction: &Transaction) {
        self.push(Event::Row(transaction.origin().to_string()));
    }

    fn complete(&mut self, batches: &[Batch]) -> Result<()> {
        self.push(Event::Complete(batches.len()));
        Ok(())
    }
}

/// Recording sink that panics while rendering one origin's row
#[derive(Clone, Default)]
pub struct PanickingSink {
    pub inner: RecordingSink,
    pub origin: String,
}

impl OutputSink for PanickingSink {
    fn batch_header(&mut self, request: &BaseRequest) {
        self.inner.batch_header(request);
    }

    fn transaction_row(&mut self, transaction: &Transaction) {
        if transaction.origin() == self.origin {
            panic!("sink exploded");
        }
        self.inner.transaction_row(transaction);
    }

    fn complete(&mut self, batches: &[Batch]) -> Result<()> {
        let transactions = batches.iter().map(|b| b.transactions.len()).sum();
        self.inner.push(Event::Complete(transactions));
        Ok(())
    }
}

/// Transport whose every send fails to connect
pub struct RefusingTransport;

#[async_trait]
impl Transport for RefusingTransport {
    async fn send(
        &self,
        _request: &BaseRequest,
    ) -> std::result::Result<RawResponse, TransactionError> {
        Err(TransactionError::Connect("connection refused".to_string()))
    }
}

/// Transport that panics for one origin and refuses the others
pub struct PanickingTransport {
    pub origin: String,
}

#[async_trait]
impl Transport for PanickingTransport {
    async fn send(
        &self,
        request: &BaseRequest,
    ) -> std::result::Result<RawResponse, TransactionError> {
        if request.origin() == Some(self.origin.as_str()) {
            panic!("transport exploded");
        }
        Err(TransactionError::Connect("connection refused".to_string()))
    }
}

/// Creates a test WatchConfig pointing to a wiremock server
pub fn test_config(target: &str) -> WatchConfig {
    WatchConfig {
        url: Some(target.to_string()),
        timeout_secs: 5,
        user_agent: "cors-watcher-test/0.1.0".to_string(),
        ..WatchConfig::default()
    }
}

/// A URL nothing listens on
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}
