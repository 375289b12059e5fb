//! Response classification
//!
//! Turns a completed transaction into an ordered list of tags. The decision
//! depends only on the response headers, the origin that was sent and the
//! target's own origin.

use crate::models::{Severity, Tag, Transaction};

/// Tag given to transactions that produced no response
pub const TRANSACTION_FAIL: &str = "Transaction Fail";

/// Computes the tags for a dispatched transaction.
///
/// Pending transactions get no tags.
pub fn classify(transaction: &Transaction) -> Vec<Tag> {
    if transaction.error().is_some() {
        return vec![Tag::new(TRANSACTION_FAIL, Severity::High)];
    }

    let Some(response) = transaction.response() else {
        return Vec::new();
    };

    if !response.access_control_detected {
        return Vec::new();
    }

    let acao = response.allow_origin.as_str();
    let sent_origin = transaction.origin();
    let is_target_host = transaction.target_host.as_deref() == Some(acao);
    let reflects_origin = acao == sent_origin;

    let mut tags = vec![Tag::new("AC*", Severity::Info)];

    if !acao.is_empty() {
        let severity = if acao == "*" {
            Severity::Medium
        } else if is_target_host {
            Severity::Low
        } else if reflects_origin {
            Severity::Medium
        } else {
            Severity::Low
        };
        tags.push(Tag::new(format!("ACAO:{acao}"), severity));
    }

    match response.allow_credentials.as_str() {
        "true" => {
            let attacker_accepted =
                !acao.is_empty() && acao != "*" && reflects_origin && !is_target_host;
            let severity = if attacker_accepted {
                Severity::High
            } else {
                Severity::Low
            };
            tags.push(Tag::new("ACAC:true", severity));
        }
        "false" => tags.push(Tag::new("ACAC:false", Severity::Low)),
        _ => {}
    }

    if (acao == "*" || reflects_origin) && !is_target_host {
        if acao.contains("http://") {
            tags.push(Tag::new("HTTP", Severity::Medium));
        }
        if !response.vary_origin {
            tags.push(Tag::new("Not Vary:Origin", Severity::Medium));
        }
    }

    tags
}
