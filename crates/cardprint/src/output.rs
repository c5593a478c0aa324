//! Writing output documents to the output directory.

use std::path::{Path, PathBuf};

use cardprint_export::{Manifest, RecordSet, record_set_file_name};
use log::info;

use crate::error::CliError;
use crate::orchestrator::Skip;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

fn write(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| CliError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| CliError::io(path, e))
}

/// Write `set` as `embeddings-{set_code}.json` under `out_dir`.
///
/// # Errors
///
/// Returns [`CliError::Export`] if serialization fails and
/// [`CliError::Io`] if the file cannot be written.
pub fn write_record_set(out_dir: &Path, set_code: &str, set: &RecordSet) -> Result<PathBuf, CliError> {
    let path = out_dir.join(record_set_file_name(set_code));
    let json = set.to_json()?;
    write(&path, &json)?;
    #[allow(clippy::cast_precision_loss)]
    let mib = json.len() as f64 / (1024.0 * 1024.0);
    info!(
        "wrote {} ({} cards, {mib:.1} MiB)",
        path.display(),
        set.card_count
    );
    Ok(path)
}

/// Write `manifest` as `manifest.json` under `out_dir`.
///
/// # Errors
///
/// Same as [`write_record_set`].
pub fn write_manifest(out_dir: &Path, manifest: &Manifest) -> Result<PathBuf, CliError> {
    let path = out_dir.join(MANIFEST_FILE_NAME);
    write(&path, &manifest.to_json()?)?;
    info!(
        "wrote {} ({} sets, {} cards)",
        path.display(),
        manifest.sets.len(),
        manifest.total_cards()
    );
    Ok(path)
}

/// Write the skip report as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`CliError::Json`] if serialization fails and [`CliError::Io`]
/// if the file cannot be written.
pub fn write_skips(path: &Path, skips: &[Skip]) -> Result<(), CliError> {
    write(path, &serde_json::to_string_pretty(skips)?)?;
    info!("wrote {} ({} skipped cards)", path.display(), skips.len());
    Ok(())
}
