//! JSON results export

use crate::error::Result;
use crate::models::{Batch, Tag};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Serializable view of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsDocument {
    /// When the document was produced
    pub generated_at: DateTime<Local>,
    /// One entry per batch
    pub requests: Vec<RequestResults>,
}

/// One base request and what each origin got back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestResults {
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    pub responses: Vec<ResponseEntry>,
}

/// Result of one origin probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub status_code: u16,
    pub size: i64,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Builds the document shared by the JSON and YAML exports
pub fn build_document(batches: &[Batch]) -> ResultsDocument {
    let requests = batches
        .iter()
        .map(|batch| RequestResults {
            url: batch.request.url.clone(),
            method: batch.request.method.clone(),
            headers: batch.request.headers_without_origin(),
            data: batch.request.body.clone(),
            responses: batch
                .transactions
                .iter()
                .map(|t| ResponseEntry {
                    status_code: t.status_code(),
                    size: t.length(),
                    origin: t.origin().to_string(),
                    tags: t.tags.clone(),
                    error: t.error().map(ToString::to_string),
                })
                .collect(),
        })
        .collect();

    ResultsDocument {
        generated_at: Local::now(),
        requests,
    }
}

/// Exports results as a pretty printed JSON file
pub fn export(batches: &[Batch], output_path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(&build_document(batches))?;
    json.push('\n');
    std::fs::write(output_path, json)?;
    info!("JSON results saved to {}", output_path.display());
    Ok(())
}
