//! Record set serializer: every fingerprint of one card set in a single
//! JSON document.
//!
//! ```json
//! {"version":"1.0.0","model":"…","embeddingDim":1280,"cardCount":2,
//!  "generatedAt":"2025-01-31T08:15:02.123456Z",
//!  "entries":[{"cardCode":"KS-001","embedding":[…],"histogram":[…],
//!              "color":"red","dhash":[…]}, …]}
//! ```
//!
//! `dhash` holds the spatial color descriptor; the key name is what the
//! matching client reads. Record sets are written compactly since they
//! are large and machine-read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cardprint_pipeline::{FingerprintRecord, HISTOGRAM_LEN, SPATIAL_LEN};

use crate::{ExportError, FORMAT_VERSION, format_timestamp};

/// One card in a record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEntry {
    /// Card identifier.
    pub card_code: String,
    /// Centroid embedding.
    pub embedding: Vec<f64>,
    /// HSV histogram.
    pub histogram: Vec<f32>,
    /// Grouping tag, `null` when absent.
    #[serde(rename = "color")]
    pub group: Option<String>,
    /// Spatial color descriptor.
    #[serde(rename = "dhash")]
    pub spatial: Vec<f32>,
}

impl From<FingerprintRecord> for RecordEntry {
    fn from(record: FingerprintRecord) -> Self {
        Self {
            card_code: record.card_id,
            embedding: record.embedding,
            histogram: record.histogram,
            group: record.group,
            spatial: record.spatial,
        }
    }
}

/// All fingerprints of one card set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    /// Format version, [`FORMAT_VERSION`].
    pub version: String,
    /// Identifier of the extractor that produced every embedding.
    pub model: String,
    /// Length of every embedding.
    pub embedding_dim: usize,
    /// Number of entries.
    pub card_count: usize,
    /// RFC 3339 UTC generation time.
    pub generated_at: String,
    /// The fingerprints, in catalog order.
    pub entries: Vec<RecordEntry>,
}

impl RecordSet {
    /// Build a record set, checking every record against the declared
    /// extractor and dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::ExtractorMismatch`] if a record was produced
    /// by a different extractor than `model`, and
    /// [`ExportError::DimensionMismatch`] if its embedding, histogram or
    /// spatial descriptor has the wrong length.
    pub fn from_records(
        records: Vec<FingerprintRecord>,
        model: &str,
        embedding_dim: usize,
        generated_at: DateTime<Utc>,
    ) -> Result<Self, ExportError> {
        for record in &records {
            validate(record, model, embedding_dim)?;
        }
        let entries: Vec<RecordEntry> = records.into_iter().map(RecordEntry::from).collect();
        Ok(Self {
            version: FORMAT_VERSION.to_owned(),
            model: model.to_owned(),
            embedding_dim,
            card_count: entries.len(),
            generated_at: format_timestamp(generated_at),
            entries,
        })
    }

    /// Serialize as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a record set.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if `json` is not a record set.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn validate(record: &FingerprintRecord, model: &str, embedding_dim: usize) -> Result<(), ExportError> {
    if record.extractor != model {
        return Err(ExportError::ExtractorMismatch {
            card_id: record.card_id.clone(),
            expected: model.to_owned(),
            actual: record.extractor.clone(),
        });
    }
    let lengths = [
        ("embedding", record.embedding.len(), embedding_dim),
        ("histogram", record.histogram.len(), HISTOGRAM_LEN),
        ("dhash", record.spatial.len(), SPATIAL_LEN),
    ];
    for (field, actual, expected) in lengths {
        if actual != expected {
            return Err(ExportError::DimensionMismatch {
                card_id: record.card_id.clone(),
                field,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// File name of the record set for `set_code`.
#[must_use]
pub fn record_set_file_name(set_code: &str) -> String {
    format!("embeddings-{set_code}.json")
}
