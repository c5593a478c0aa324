//! cardprint-export: pure serializers for fingerprint output (sans-IO).
//!
//! Converts [`FingerprintRecord`](cardprint_pipeline::FingerprintRecord)s
//! into the JSON documents the matching client loads: one record set per
//! card set, plus a manifest listing them. Nothing here touches the
//! filesystem; callers decide where the strings go.

pub mod manifest;
pub mod records;

use chrono::{DateTime, SecondsFormat, Utc};

pub use manifest::{Manifest, ManifestEntry};
pub use records::{RecordEntry, RecordSet, record_set_file_name};

/// Version written into every record set and manifest.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Errors that can occur while assembling output documents.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A record was produced by a different extractor than the set declares.
    #[error("card {card_id}: produced by extractor {actual:?}, expected {expected:?}")]
    ExtractorMismatch {
        /// Offending card.
        card_id: String,
        /// Extractor the set declares.
        expected: String,
        /// Extractor recorded on the card.
        actual: String,
    },

    /// A record vector has the wrong length.
    #[error("card {card_id}: {field} has {actual} values, expected {expected}")]
    DimensionMismatch {
        /// Offending card.
        card_id: String,
        /// Which vector.
        field: &'static str,
        /// Required length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Format a generation time as RFC 3339 UTC with microseconds and a `Z`
/// suffix, e.g. `2025-01-31T08:15:02.123456Z`.
#[must_use]
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}
