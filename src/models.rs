//! Core data models for cors-watcher

use crate::error::TransactionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Header carrying the probed origin
pub const ORIGIN_HEADER: &str = "Origin";

/// Severity attached to a classification tag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// A human readable observation about one transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Short label such as `ACAO:*`
    pub info: String,
    /// How worrying the observation is
    pub severity: Severity,
}

impl Tag {
    /// Creates a new tag
    pub fn new(info: impl Into<String>, severity: Severity) -> Self {
        Self {
            info: info.into(),
            severity,
        }
    }
}

/// A request as supplied by the user, before any origin is injected
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BaseRequest {
    /// Target URL
    #[serde(default)]
    pub url: String,
    /// HTTP method
    #[serde(default)]
    pub method: String,
    /// Extra request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Request body
    #[serde(default, rename = "data", skip_serializing_if = "String::is_empty")]
    pub body: String,
}

impl BaseRequest {
    /// Creates a request with no headers and no body
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    /// Sets a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns a copy of this request whose `Origin` header is `origin`.
    ///
    /// Any existing origin header is replaced regardless of its case.
    pub fn with_origin(&self, origin: &str) -> Self {
        let mut headers: BTreeMap<String, String> = self
            .headers
            .iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case(ORIGIN_HEADER))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        headers.insert(ORIGIN_HEADER.to_string(), origin.to_string());

        Self {
            url: self.url.clone(),
            method: self.method.clone(),
            headers,
            body: self.body.clone(),
        }
    }

    /// The `Origin` header value, if any
    pub fn origin(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(ORIGIN_HEADER))
            .map(|(_, value)| value.as_str())
    }

    /// Headers other than `Origin`
    pub fn headers_without_origin(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case(ORIGIN_HEADER))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Which bypass pattern an origin variant exercises
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Unrelated origin (`https://test.com`)
    Arbitrary,
    /// The literal `null` origin
    Null,
    /// The target's own scheme and host
    Legitimate,
    /// `test` glued in front of the host
    Prefixed,
    /// Host followed by `.test.com`
    Suffixed,
    /// `test.` subdomain of the host
    Subdomain,
    /// `test.<host><char>.test.com`
    SpecialCharacter,
    /// Entry of the origins file
    File,
}

impl VariantKind {
    /// Human description shown next to the origin
    pub fn label(&self) -> &'static str {
        match self {
            VariantKind::Arbitrary => "arbitrary",
            VariantKind::Null => "null",
            VariantKind::Legitimate => "legitimate",
            VariantKind::Prefixed => "prefix",
            VariantKind::Suffixed => "suffix",
            VariantKind::Subdomain => "subdomain",
            VariantKind::SpecialCharacter => "special-character suffix",
            VariantKind::File => "",
        }
    }
}

/// One candidate value for the `Origin` request header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OriginVariant {
    /// Bypass pattern the value exercises
    pub kind: VariantKind,
    /// Literal header value
    pub value: String,
}

impl OriginVariant {
    /// Creates a new variant
    pub fn new(kind: VariantKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Human description of the variant
    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}

/// What the server answered for one transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status_code: u16,
    /// Body length in bytes, -1 when the body could not be read
    pub length: i64,
    /// Whether any `Access-Control-*` header was present
    pub access_control_detected: bool,
    /// `Access-Control-Allow-Origin`, empty when absent
    pub allow_origin: String,
    /// `Access-Control-Allow-Credentials`, empty when absent
    pub allow_credentials: String,
    /// Whether `Vary` lists `Origin`
    pub vary_origin: bool,
}

/// Result of dispatching one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Outcome {
    /// Not dispatched yet
    #[default]
    Pending,
    /// The server answered
    Response(Response),
    /// The request could not be completed
    Error(TransactionError),
}

/// One base request probed with one origin variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Request with the variant's `Origin` header applied
    pub request: BaseRequest,
    /// Response or error, filled by the dispatcher
    pub outcome: Outcome,
    /// Classification, filled after dispatch
    pub tags: Vec<Tag>,
    /// Scheme and host of the target URL, the legitimate origin
    pub target_host: Option<String>,
}

impl Transaction {
    /// Creates a pending transaction
    pub fn new(request: BaseRequest, target_host: Option<String>) -> Self {
        Self {
            request,
            outcome: Outcome::Pending,
            tags: Vec::new(),
            target_host,
        }
    }

    /// The origin sent with this transaction
    pub fn origin(&self) -> &str {
        self.request.origin().unwrap_or_default()
    }

    /// The response, if the transaction succeeded
    pub fn response(&self) -> Option<&Response> {
        match &self.outcome {
            Outcome::Response(response) => Some(response),
            _ => None,
        }
    }

    /// The error, if the transaction failed
    pub fn error(&self) -> Option<&TransactionError> {
        match &self.outcome {
            Outcome::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Records a response
    pub fn set_response(&mut self, response: Response) {
        self.outcome = Outcome::Response(response);
    }

    /// Records an error
    pub fn set_error(&mut self, err: TransactionError) {
        self.outcome = Outcome::Error(err);
    }

    /// Status code, 0 when there is no response
    pub fn status_code(&self) -> u16 {
        self.response().map(|r| r.status_code).unwrap_or(0)
    }

    /// Body length, -1 when unknown or when there is no response
    pub fn length(&self) -> i64 {
        self.response().map(|r| r.length).unwrap_or(-1)
    }
}

/// All transactions generated from one base request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// The request as supplied by the user
    pub request: BaseRequest,
    /// Scheme and host of the request URL
    pub target_host: Option<String>,
    /// One transaction per origin variant, in launch order
    pub transactions: Vec<Transaction>,
}

impl Batch {
    /// Counts tags by severity across the batch
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.transactions
            .iter()
            .flat_map(|t| t.tags.iter())
            .filter(|tag| tag.severity == severity)
            .count()
    }
}

/// Files the results are written to once every batch has completed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputTargets {
    /// Plain text table
    pub text: Option<PathBuf>,
    /// JSON document
    pub json: Option<PathBuf>,
    /// CSV rows
    pub csv: Option<PathBuf>,
    /// YAML document
    pub yaml: Option<PathBuf>,
}

/// Configuration for a watch session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Target URL
    pub url: Option<String>,
    /// Method used for the target URL
    pub method: String,
    /// Extra headers for the target URL in `key:value, key:value` form
    pub headers: Option<String>,
    /// Body for the target URL
    pub data: Option<String>,
    /// File with one origin per line
    pub origins_file: Option<PathBuf>,
    /// Origins loaded from `origins_file`
    #[serde(skip)]
    pub file_origins: Vec<String>,
    /// Probe only the origins from the origins file
    pub only_file_origins: bool,
    /// File with one JSON request per line
    pub requests_file: Option<PathBuf>,
    /// Requests loaded from `requests_file`
    #[serde(skip)]
    pub file_requests: Vec<BaseRequest>,
    /// Characters used for the special-character subdomain variants
    pub special_characters: Vec<String>,
    /// Request timeout in seconds, 0 disables it
    pub timeout_secs: u64,
    /// Delay between two launches in seconds
    pub delay_secs: f64,
    /// `http://` or `socks5://` proxy URL
    pub proxy: Option<String>,
    /// User-Agent header value
    pub user_agent: String,
    /// Result files
    pub output: OutputTargets,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            url: None,
            method: "GET".to_string(),
            headers: None,
            data: None,
            origins_file: None,
            file_origins: Vec::new(),
            only_file_origins: false,
            requests_file: None,
            file_requests: Vec::new(),
            special_characters: crate::scanner::origins::SPECIAL_CHARACTERS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            timeout_secs: 10,
            delay_secs: 0.0,
            proxy: None,
            user_agent: format!("cors-watcher/{}", env!("CARGO_PKG_VERSION")),
            output: OutputTargets::default(),
        }
    }
}
