//! Configuration management for cors-watcher

use crate::error::{Result, WatcherError};
use crate::models::WatchConfig;
use crate::validator::{
    matches, max_chars, not_blank, Validator, FILE_NAME_PATTERN, HEADERS_PATTERN, METHOD_PATTERN,
    PROXY_PATTERN, URL_PATTERN,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MAX_URL_CHARS: usize = 100;
const MAX_HEADERS_CHARS: usize = 500;
const MAX_DATA_CHARS: usize = 500;
const MAX_TIMEOUT_SECS: u64 = 10;
const MAX_DELAY_SECS: f64 = 5.0;
const MAX_FILE_NAME_CHARS: usize = 20;

/// File-based configuration structure
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    scan: Option<ScanSection>,
    origins: Option<OriginsSection>,
    output: Option<OutputSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanSection {
    method: Option<String>,
    timeout_secs: Option<u64>,
    delay_secs: Option<f64>,
    proxy: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OriginsSection {
    file: Option<PathBuf>,
    only_file: Option<bool>,
    special_characters: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputSection {
    text: Option<PathBuf>,
    json: Option<PathBuf>,
    csv: Option<PathBuf>,
    yaml: Option<PathBuf>,
}

/// Parses a TOML configuration on top of the defaults
pub fn parse_config(content: &str) -> Result<WatchConfig> {
    let file_config: FileConfig = toml::from_str(content)?;
    let mut config = WatchConfig::default();

    if let Some(scan) = file_config.scan {
        if let Some(method) = scan.method {
            config.method = method;
        }
        if let Some(timeout) = scan.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(delay) = scan.delay_secs {
            config.delay_secs = delay;
        }
        if let Some(ua) = scan.user_agent {
            config.user_agent = ua;
        }
        config.proxy = scan.proxy;
    }

    if let Some(origins) = file_config.origins {
        config.origins_file = origins.file;
        if let Some(only) = origins.only_file {
            config.only_file_origins = only;
        }
        if let Some(characters) = origins.special_characters {
            config.special_characters = characters;
        }
    }

    if let Some(output) = file_config.output {
        config.output.text = output.text;
        config.output.json = output.json;
        config.output.csv = output.csv;
        config.output.yaml = output.yaml;
    }

    Ok(config)
}

/// Loads configuration from a TOML file and merges with defaults
pub fn load_config(path: &Path) -> Result<WatchConfig> {
    let content = std::fs::read_to_string(path).map_err(WatcherError::IoError)?;
    parse_config(&content)
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: Option<String>,
    pub data: Option<String>,
    pub origins_file: Option<PathBuf>,
    pub only_origins: bool,
    pub requests_file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub output_json: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
    pub output_yaml: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub delay: Option<f64>,
    pub proxy: Option<String>,
}

/// Merges CLI arguments into an existing WatchConfig
pub fn merge_cli_args(config: &mut WatchConfig, cli: CliOverrides) {
    if cli.url.is_some() {
        config.url = cli.url;
    }
    if let Some(method) = cli.method {
        config.method = method;
    }
    if cli.headers.is_some() {
        config.headers = cli.headers;
    }
    if cli.data.is_some() {
        config.data = cli.data;
    }
    if cli.origins_file.is_some() {
        config.origins_file = cli.origins_file;
    }
    if cli.only_origins {
        config.only_file_origins = true;
    }
    if cli.requests_file.is_some() {
        config.requests_file = cli.requests_file;
    }
    if cli.output.is_some() {
        config.output.text = cli.output;
    }
    if cli.output_json.is_some() {
        config.output.json = cli.output_json;
    }
    if cli.output_csv.is_some() {
        config.output.csv = cli.output_csv;
    }
    if cli.output_yaml.is_some() {
        config.output.yaml = cli.output_yaml;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(delay) = cli.delay {
        config.delay_secs = delay;
    }
    if cli.proxy.is_some() {
        config.proxy = cli.proxy;
    }
}

fn check_file_name(v: &mut Validator, option: &str, path: Option<&Path>) {
    if let Some(path) = path {
        let name = path.to_string_lossy();
        v.check(
            max_chars(&name, MAX_FILE_NAME_CHARS),
            option,
            "Cannot exceed 20 characters",
        );
        v.check(
            matches(&name, FILE_NAME_PATTERN),
            option,
            "A filename cannot contain '/'",
        );
    }
}

/// Checks every option and reports all problems at once
pub fn validate(config: &WatchConfig) -> Result<()> {
    let mut v = Validator::new();

    let url = config.url.as_deref().unwrap_or_default();
    let has_url = not_blank(url);
    v.check(
        has_url || config.requests_file.is_some(),
        "--url,--requests-file",
        "You must use one of these options",
    );
    if has_url {
        v.check(
            max_chars(url, MAX_URL_CHARS),
            "--url",
            "Cannot exceed 100 characters",
        );
        v.check(
            matches(url, URL_PATTERN),
            "--url",
            "Must be a valid URL, starting with http:// or https://",
        );
    }

    v.check(
        matches(&config.method, METHOD_PATTERN),
        "--method",
        "Accepted methods are GET, POST, PUT, DELETE, and PATCH",
    );

    if let Some(headers) = config.headers.as_deref().filter(|h| not_blank(h)) {
        v.check(
            max_chars(headers, MAX_HEADERS_CHARS),
            "--headers",
            "Cannot exceed 500 characters",
        );
        v.check(
            matches(headers, HEADERS_PATTERN),
            "--headers",
            r#"Must follow the format "key:value, key:value, ...""#,
        );
    }

    if let Some(data) = config.data.as_deref() {
        v.check(
            max_chars(data, MAX_DATA_CHARS),
            "--data",
            "Cannot exceed 500 characters",
        );
    }

    check_file_name(&mut v, "--origins-file", config.origins_file.as_deref());
    check_file_name(&mut v, "--requests-file", config.requests_file.as_deref());
    check_file_name(&mut v, "--output", config.output.text.as_deref());
    check_file_name(&mut v, "--output-json", config.output.json.as_deref());
    check_file_name(&mut v, "--output-csv", config.output.csv.as_deref());
    check_file_name(&mut v, "--output-yaml", config.output.yaml.as_deref());

    v.check(
        config.timeout_secs <= MAX_TIMEOUT_SECS,
        "--timeout",
        "Must be less than 10",
    );
    v.check(
        config.delay_secs.is_finite() && config.delay_secs >= 0.0,
        "--delay",
        "Must be greater than 0",
    );
    v.check(
        config.delay_secs <= MAX_DELAY_SECS,
        "--delay",
        "Must be less than 5",
    );

    if let Some(proxy) = config.proxy.as_deref() {
        v.check(
            matches(proxy, PROXY_PATTERN),
            "--proxy",
            "Must start with http:// or socks5://",
        );
    }

    v.finish()
}

fn with_extension(path: &mut Option<PathBuf>, extension: &str) {
    if let Some(p) = path {
        if !p.to_string_lossy().contains(&format!(".{extension}")) {
            let mut name = p.clone().into_os_string();
            name.push(format!(".{extension}"));
            *p = PathBuf::from(name);
        }
    }
}

/// Appends `.json` / `.csv` to output names lacking them
pub fn normalize_outputs(config: &mut WatchConfig) {
    with_extension(&mut config.output.json, "json");
    with_extension(&mut config.output.csv, "csv");
}
