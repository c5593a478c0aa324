//! Image acquisition.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use cardprint_pipeline::PipelineError;

use crate::catalog::CatalogCard;

/// Supplies the encoded image of a card.
///
/// Failures are per card: the orchestrator records them as skips and
/// never retries.
pub trait ImageSource: Send + Sync {
    /// Encoded image bytes for `card`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Acquisition`] if the image is unavailable.
    fn fetch(&self, card: &CatalogCard) -> Result<Vec<u8>, PipelineError>;
}

/// Reads `{root}/{id}.{ext}` for the first extension in
/// [`DirectorySource::EXTENSIONS`] that exists.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Extensions tried, in order.
    pub const EXTENSIONS: [&'static str; 4] = ["jpg", "jpeg", "png", "webp"];

    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageSource for DirectorySource {
    fn fetch(&self, card: &CatalogCard) -> Result<Vec<u8>, PipelineError> {
        let id = card.id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(PipelineError::Acquisition(format!(
                "card id {id:?} is not a valid file name"
            )));
        }
        for ext in Self::EXTENSIONS {
            let path = self.root.join(format!("{id}.{ext}"));
            match std::fs::read(&path) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == IoErrorKind::NotFound => {}
                Err(e) => {
                    return Err(PipelineError::Acquisition(format!(
                        "{}: {e}",
                        path.display()
                    )));
                }
            }
        }
        Err(PipelineError::Acquisition(format!(
            "no image for {id} in {}",
            self.root.display()
        )))
    }
}
