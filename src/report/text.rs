//! Plain text results export

use super::{batch_header_lines, plain_row, table_head};
use crate::error::Result;
use crate::models::Batch;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Renders every batch as an uncolored table
pub fn render(batches: &[Batch]) -> String {
    let mut text = String::new();

    for batch in batches {
        for line in batch_header_lines(&batch.request) {
            text.push_str(&format!("[+] {line}\n"));
        }
        for line in table_head() {
            text.push_str(line);
            text.push('\n');
        }
        for transaction in &batch.transactions {
            text.push_str(&plain_row(transaction));
            text.push('\n');
        }
        text.push('\n');
    }

    text
}

/// Exports results as a plain text file
pub fn export(batches: &[Batch], output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path)?;
    let mut writer = std::io::BufWriter::new(file);
    writer.write_all(render(batches).as_bytes())?;
    writer.flush()?;
    info!("Text results saved to {}", output_path.display());
    Ok(())
}
