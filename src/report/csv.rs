//! CSV results export (RFC 4180 compliant)

use crate::error::Result;
use crate::models::Batch;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Escapes a field for CSV according to RFC 4180
fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Exports one row per transaction
pub fn export(batches: &[Batch], output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path)?;
    let mut writer = std::io::BufWriter::new(file);

    writeln!(writer, "Url,Method,Headers,Data,Status,Size,Origin,Tags")?;

    for batch in batches {
        for t in &batch.transactions {
            let headers = serde_json::to_string(&t.request.headers_without_origin())?;
            let tags = t
                .tags
                .iter()
                .map(|tag| tag.info.as_str())
                .collect::<Vec<_>>()
                .join(",");

            let row = [
                escape_csv(&t.request.url),
                escape_csv(&t.request.method),
                escape_csv(&headers),
                escape_csv(&t.request.body),
                t.status_code().to_string(),
                t.length().to_string(),
                escape_csv(t.origin()),
                escape_csv(&tags),
            ]
            .join(",");
            writeln!(writer, "{row}")?;
        }
    }

    writer.flush()?;
    info!("CSV results saved to {}", output_path.display());
    Ok(())
}
