//! YAML results export

use super::json::build_document;
use crate::error::Result;
use crate::models::Batch;
use std::path::Path;
use tracing::info;

/// Exports results as a YAML file with the same shape as the JSON export
pub fn export(batches: &[Batch], output_path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(&build_document(batches))?;
    std::fs::write(output_path, yaml)?;
    info!("YAML results saved to {}", output_path.display());
    Ok(())
}
