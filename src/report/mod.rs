//! Rendering of batches and transactions
//!
//! The dispatcher talks to an [`OutputSink`]; the console sink prints the
//! live table and, once everything is done, writes the requested files.

pub mod console;
pub mod csv;
pub mod json;
pub mod text;
pub mod yaml;

pub use console::ConsoleSink;

use crate::error::Result;
use crate::models::{Batch, BaseRequest, OutputTargets, Transaction};
use tracing::info;

/// Receiver of everything the dispatcher produces
pub trait OutputSink: Send {
    /// Called once per batch, before any of its transactions is launched
    fn batch_header(&mut self, request: &BaseRequest);

    /// Called once per finished transaction, in completion order
    fn transaction_row(&mut self, transaction: &Transaction);

    /// Called after the last batch with every gathered transaction
    fn complete(&mut self, batches: &[Batch]) -> Result<()>;
}

const TABLE_RULE: &str = "+------+------+-------------";
const TABLE_TITLE: &str = "|STATUS| SIZE |   ORIGIN    ";
const CELL_WIDTH: usize = 5;

/// Describes a batch's request, one line per field, without prefix
pub(crate) fn batch_header_lines(request: &BaseRequest) -> Vec<String> {
    let mut lines = vec![
        format!("URL: {}", request.url),
        format!("Method: {}", request.method),
    ];

    let headers = request.headers_without_origin();
    if !headers.is_empty() {
        let joined = headers
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Headers: {{{joined}}}"));
    }

    if !request.body.is_empty() && !request.method.eq_ignore_ascii_case("GET") {
        lines.push(format!("Data: {}", request.body));
    }

    lines
}

/// The three lines opening a results table
pub(crate) fn table_head() -> [&'static str; 3] {
    [TABLE_RULE, TABLE_TITLE, TABLE_RULE]
}

fn pad(cell: &str) -> String {
    if cell.len() > CELL_WIDTH {
        format!("{cell} ")
    } else {
        format!("{cell:<width$}", width = CELL_WIDTH + 1)
    }
}

/// Status, size and origin cells of a row, without tags
pub(crate) fn row_prefix(transaction: &Transaction) -> String {
    let length = transaction.length();
    let size = if length < 0 {
        "unk".to_string()
    } else {
        length.to_string()
    };

    format!(
        "| {}| {}| {}",
        pad(&transaction.status_code().to_string()),
        pad(&size),
        transaction.origin()
    )
}

/// A full uncolored row
pub(crate) fn plain_row(transaction: &Transaction) -> String {
    let mut row = row_prefix(transaction);
    for tag in &transaction.tags {
        row.push_str(&format!("  {} ", tag.info));
    }
    row
}

/// Writes every requested result file
pub fn export_all(batches: &[Batch], targets: &OutputTargets) -> Result<()> {
    if let Some(ref path) = targets.text {
        text::export(batches, path)?;
    }
    if let Some(ref path) = targets.json {
        json::export(batches, path)?;
    }
    if let Some(ref path) = targets.csv {
        csv::export(batches, path)?;
    }
    if let Some(ref path) = targets.yaml {
        yaml::export(batches, path)?;
    }

    let written = [&targets.text, &targets.json, &targets.csv, &targets.yaml]
        .iter()
        .filter(|t| t.is_some())
        .count();
    if written > 0 {
        info!("Saved {written} result file(s)");
    }

    Ok(())
}
