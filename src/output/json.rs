//! JSON output formatter

use crate::models::NormalizedCertificate;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Pretty JSON of a certificate record
pub fn to_json(cert: &NormalizedCertificate) -> serde_json::Result<String> {
    serde_json::to_string_pretty(cert)
}

/// Print a certificate record as JSON to stdout
pub fn print_json(cert: &NormalizedCertificate) -> anyhow::Result<()> {
    let json = to_json(cert)?;
    println!("{}", json);
    Ok(())
}

/// Write a certificate record as JSON. A directory path receives the
/// record under its default export file name. Returns the written path.
pub fn write_json_file(cert: &NormalizedCertificate, path: &Path) -> anyhow::Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(cert.export_file_name())
    } else {
        path.to_path_buf()
    };

    let json = to_json(cert)?;
    std::fs::write(&target, json)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    tracing::info!("Exported certificate to {}", target.display());
    Ok(target)
}
