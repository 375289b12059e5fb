//! Option validation helpers

use crate::error::{OptionError, Result, WatcherError};
use regex::Regex;

/// Absolute http(s) URL without whitespace
pub const URL_PATTERN: &str = r"^https?://\S+$";

/// Methods accepted for probe requests
pub const METHOD_PATTERN: &str = r"^(GET|POST|PUT|DELETE|PATCH)$";

/// `key:value, key:value` header list
pub const HEADERS_PATTERN: &str =
    r"^([a-zA-Z0-9!#$%&'*+.^_`|~-]+):\S+(, [a-zA-Z0-9!#$%&'*+.^_`|~-]+:\S+)*$";

/// Supported proxy schemes
pub const PROXY_PATTERN: &str = r"^(http://|socks5://)";

/// Bare file name, no directories
pub const FILE_NAME_PATTERN: &str = r"^[^/]*$";

/// Collects option errors, keeping the first message per option
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<OptionError>,
}

impl Validator {
    /// Creates an empty validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when no error was recorded
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records an error unless `option` already has one
    pub fn add_error(&mut self, option: &str, message: &str) {
        if self.errors.iter().any(|e| e.option == option) {
            return;
        }
        self.errors.push(OptionError {
            option: option.to_string(),
            message: message.to_string(),
        });
    }

    /// Records an error when `ok` is false
    pub fn check(&mut self, ok: bool, option: &str, message: &str) {
        if !ok {
            self.add_error(option, message);
        }
    }

    /// Recorded errors
    pub fn errors(&self) -> &[OptionError] {
        &self.errors
    }

    /// Turns the recorded errors into a result
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(WatcherError::InvalidOptions(self.errors))
        }
    }
}

/// True when the value has non-whitespace content
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True when the value has at most `n` characters
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True when the value matches `pattern`
pub fn matches(value: &str, pattern: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(value),
        Err(_) => false,
    }
}
