//! Transaction expansion and execution

use crate::http::{RawResponse, Transport};
use crate::models::{BaseRequest, OriginVariant, Response, Transaction};
use reqwest::header::{HeaderMap, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, VARY};
use tracing::{debug, warn};

const ACCESS_CONTROL_PREFIX: &str = "access-control-";

/// Crosses one base request with its origin variants.
///
/// Every transaction owns its own copy of the headers with `Origin` set to
/// the variant value.
pub fn expand(
    base: &BaseRequest,
    variants: &[OriginVariant],
    target_host: Option<&str>,
) -> Vec<Transaction> {
    variants
        .iter()
        .map(|variant| {
            Transaction::new(
                base.with_origin(&variant.value),
                target_host.map(str::to_string),
            )
        })
        .collect()
}

/// Sends the transaction's request and records the response or the error.
pub async fn execute(transaction: &mut Transaction, transport: &dyn Transport) {
    match transport.send(&transaction.request).await {
        Ok(raw) => {
            let response = build_response(&raw);
            debug!(
                "Response {} for {} with Origin '{}' (ACAO '{}')",
                response.status_code,
                transaction.request.url,
                transaction.origin(),
                response.allow_origin
            );
            transaction.set_response(response);
        }
        Err(e) => {
            warn!(
                "Request to {} with Origin '{}' failed: {e}",
                transaction.request.url,
                transaction.origin()
            );
            transaction.set_error(e);
        }
    }
}

/// Extracts the CORS relevant parts of a raw response
pub fn build_response(raw: &RawResponse) -> Response {
    let headers = &raw.headers;

    Response {
        status_code: raw.status,
        length: raw
            .body_length
            .and_then(|len| i64::try_from(len).ok())
            .unwrap_or(-1),
        access_control_detected: headers
            .keys()
            .any(|name| name.as_str().starts_with(ACCESS_CONTROL_PREFIX)),
        allow_origin: first_value(headers, ACCESS_CONTROL_ALLOW_ORIGIN.as_str()),
        allow_credentials: first_value(headers, ACCESS_CONTROL_ALLOW_CREDENTIALS.as_str()),
        vary_origin: headers.get_all(VARY).iter().any(|value| {
            String::from_utf8_lossy(value.as_bytes())
                .split(',')
                .any(|item| item.trim().eq_ignore_ascii_case("origin"))
        }),
    }
}

fn first_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).trim().to_string())
        .unwrap_or_default()
}
