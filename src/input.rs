//! Loading of origins and requests files

use crate::error::{Result, WatcherError};
use crate::models::{BaseRequest, WatchConfig};
use crate::validator::{matches, not_blank, METHOD_PATTERN, URL_PATTERN};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| WatcherError::InputError {
        file: path.display().to_string(),
        message: e.to_string(),
    })
}

fn line_errors(path: &Path, errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    Err(WatcherError::InputError {
        file: path.display().to_string(),
        message: errors.join("; "),
    })
}

/// Reads one origin per line.
///
/// Every line must be an http(s) URL; all offending lines are reported.
pub fn load_origins(path: &Path) -> Result<Vec<String>> {
    let content = read_file(path)?;
    let mut origins = Vec::new();
    let mut errors = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let number = index + 1;
        let origin = line.trim();

        if !not_blank(origin) {
            errors.push(format!("line {number}: there cannot be an empty row"));
        } else if !matches(origin, URL_PATTERN) {
            errors.push(format!(
                "line {number}: each origin must be a valid URL, starting with http:// or https://"
            ));
        } else {
            origins.push(origin.to_string());
        }
    }

    line_errors(path, errors)?;
    debug!("Loaded {} origins from {}", origins.len(), path.display());
    Ok(origins)
}

/// Parses one requests-file line
pub fn parse_request_line(line: &str) -> std::result::Result<BaseRequest, String> {
    if !not_blank(line) {
        return Err("body must not be empty".to_string());
    }

    let request: BaseRequest =
        serde_json::from_str(line).map_err(|e| format!("badly-formed request: {e}"))?;

    if !not_blank(&request.url) {
        return Err("each request must contain the 'url' key".to_string());
    }
    if !matches(&request.url, URL_PATTERN) {
        return Err(
            "the 'url' key must be a valid URL, starting with http:// or https://".to_string(),
        );
    }
    if !not_blank(&request.method) {
        return Err("each request must contain the 'method' key".to_string());
    }
    if !matches(&request.method, METHOD_PATTERN) {
        return Err("the 'method' key must be one of: GET, POST, PUT, DELETE, PATCH".to_string());
    }

    Ok(request)
}

/// Reads one JSON request per line
pub fn load_requests(path: &Path) -> Result<Vec<BaseRequest>> {
    let content = read_file(path)?;
    let mut requests = Vec::new();
    let mut errors = Vec::new();

    for (index, line) in content.lines().enumerate() {
        match parse_request_line(line) {
            Ok(request) => requests.push(request),
            Err(message) => errors.push(format!("line {}: {message}", index + 1)),
        }
    }

    line_errors(path, errors)?;
    debug!("Loaded {} requests from {}", requests.len(), path.display());
    Ok(requests)
}

/// Splits a `key:value, key:value` list into headers
pub fn parse_headers(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Loads the files referenced by the configuration into it
pub fn load_files(config: &mut WatchConfig) -> Result<()> {
    if let Some(ref path) = config.origins_file {
        config.file_origins = load_origins(path)?;
    }
    if let Some(ref path) = config.requests_file {
        config.file_requests = load_requests(path)?;
    }
    Ok(())
}

/// The `--url` request followed by every requests-file entry
pub fn base_requests(config: &WatchConfig) -> Vec<BaseRequest> {
    let mut requests = Vec::new();

    if let Some(url) = config.url.as_deref().filter(|u| not_blank(u)) {
        requests.push(BaseRequest {
            url: url.to_string(),
            method: config.method.clone(),
            headers: config
                .headers
                .as_deref()
                .map(parse_headers)
                .unwrap_or_default(),
            body: config.data.clone().unwrap_or_default(),
        });
    }

    requests.extend(config.file_requests.iter().cloned());
    requests
}
