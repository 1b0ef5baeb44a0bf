//! YAML full export
//!
//! Same content as the JSON export, in a form that is easier to read.

use std::io::Write;

use crate::error::{KesefError, KesefResult};
use crate::export::json::FullExport;
use crate::storage::Storage;

/// Export the full database to YAML format
pub fn export_full_yaml<W: Write>(storage: &Storage, writer: &mut W) -> KesefResult<()> {
    let export = FullExport::from_storage(storage)?;

    let header = format!(
        "# Kesef full export\n# Generated: {}\n# App version: {}\n#\n# Contains account numbers and ID numbers in plaintext. Keep it safe.\n\n",
        export.exported_at, export.app_version
    );
    writer
        .write_all(header.as_bytes())
        .map_err(|e| KesefError::Export(e.to_string()))?;

    serde_yaml::to_writer(writer, &export).map_err(|e| KesefError::Export(e.to_string()))?;

    Ok(())
}

/// Parse and validate a YAML export
pub fn import_from_yaml(yaml_str: &str) -> KesefResult<FullExport> {
    let export: FullExport =
        serde_yaml::from_str(yaml_str).map_err(|e| KesefError::Import(e.to_string()))?;

    export.validate().map_err(KesefError::Import)?;

    Ok(export)
}
