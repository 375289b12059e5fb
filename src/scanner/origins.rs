//! Origin variant generation
//!
//! Builds the ordered list of `Origin` values probed against one target URL:
//! two baseline origins, a catalog of host-relative bypass patterns and the
//! user supplied origins.

use crate::models::{OriginVariant, VariantKind};
use std::collections::HashSet;
use url::Url;

/// Unrelated origin used to detect naive reflection
pub const ARBITRARY_ORIGIN: &str = "https://test.com";

/// Origin sent by sandboxed iframes and `file:` documents
pub const NULL_ORIGIN: &str = "null";

/// Attacker-controlled domain the bypass variants end with
const ATTACKER_DOMAIN: &str = "test.com";

/// Characters that sloppy origin parsers treat as a domain delimiter.
///
/// `%0b` and `%60` are kept percent-encoded so results stay comparable with
/// earlier scans.
pub const SPECIAL_CHARACTERS: &[&str] = &[
    "!", "\"", "$", "%0b", "%60", "_", "&", "'", "(", ")", "*", ",", ";", "=", "^", "`", "{",
    "|", "}", "~",
];

/// Options controlling which variants are produced
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Skip the baseline and host-relative variants
    pub only_file_origins: bool,
    /// Origins read from the origins file, in file order
    pub file_origins: Vec<String>,
    /// Delimiter characters for the special-character variants
    pub special_characters: Vec<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            only_file_origins: false,
            file_origins: Vec::new(),
            special_characters: SPECIAL_CHARACTERS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Scheme, hostname and explicit port of a target URL
struct TargetParts {
    scheme: String,
    hostname: String,
    port: String,
}

impl TargetParts {
    fn parse(target_url: &str) -> Option<Self> {
        let url = Url::parse(target_url).ok()?;
        let hostname = url.host_str().filter(|h| !h.is_empty())?.to_string();
        let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();

        Some(Self {
            scheme: url.scheme().to_string(),
            hostname,
            port,
        })
    }

    fn origin(&self, host: &str) -> String {
        format!("{}://{}{}", self.scheme, host, self.port)
    }
}

/// Returns the scheme and host of `target_url`, the legitimate origin.
///
/// `None` when the URL has no scheme or host.
pub fn target_host(target_url: &str) -> Option<String> {
    TargetParts::parse(target_url).map(|parts| parts.origin(&parts.hostname))
}

/// Produces the ordered, duplicate-free list of origins to probe.
pub fn generate_variants(target_url: &str, options: &GeneratorOptions) -> Vec<OriginVariant> {
    let mut variants = Vec::new();

    if !options.only_file_origins {
        variants.push(OriginVariant::new(VariantKind::Arbitrary, ARBITRARY_ORIGIN));
        variants.push(OriginVariant::new(VariantKind::Null, NULL_ORIGIN));

        if let Some(parts) = TargetParts::parse(target_url) {
            variants.extend(host_variants(&parts, &options.special_characters));
        }
    }

    variants.extend(
        options
            .file_origins
            .iter()
            .map(|origin| OriginVariant::new(VariantKind::File, origin.as_str())),
    );

    let mut seen = HashSet::new();
    variants.retain(|variant| seen.insert(variant.value.clone()));
    variants
}

fn host_variants(parts: &TargetParts, special_characters: &[String]) -> Vec<OriginVariant> {
    let host = &parts.hostname;

    let mut variants = vec![
        OriginVariant::new(VariantKind::Legitimate, parts.origin(host)),
        OriginVariant::new(VariantKind::Prefixed, parts.origin(&format!("test{host}"))),
        OriginVariant::new(
            VariantKind::Suffixed,
            parts.origin(&format!("{host}.{ATTACKER_DOMAIN}")),
        ),
        OriginVariant::new(VariantKind::Subdomain, parts.origin(&format!("test.{host}"))),
    ];

    variants.extend(special_characters.iter().map(|c| {
        OriginVariant::new(
            VariantKind::SpecialCharacter,
            parts.origin(&format!("test.{host}{c}.{ATTACKER_DOMAIN}")),
        )
    }));

    variants
}
