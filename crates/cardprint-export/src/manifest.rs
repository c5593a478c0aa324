//! Manifest serializer: the index of all record sets produced by a run.
//!
//! The manifest is small and read by people as well as the client, so it
//! is pretty-printed with two-space indentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::record_set_file_name;
use crate::{ExportError, FORMAT_VERSION, format_timestamp};

/// One record set listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Card set code.
    pub set_code: String,
    /// Where the client fetches the record set.
    pub embeddings_url: String,
    /// Number of cards in the record set.
    pub card_count: usize,
}

impl ManifestEntry {
    /// Entry for `set_code`, served under `url_prefix`.
    ///
    /// A trailing slash on the prefix is ignored.
    #[must_use]
    pub fn new(set_code: &str, url_prefix: &str, card_count: usize) -> Self {
        let prefix = url_prefix.trim_end_matches('/');
        Self {
            set_code: set_code.to_owned(),
            embeddings_url: format!("{prefix}/{}", record_set_file_name(set_code)),
            card_count,
        }
    }
}

/// Index of every record set of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Format version, [`FORMAT_VERSION`].
    pub version: String,
    /// Extractor identifier shared by every record set.
    pub model: String,
    /// Record sets, sorted by set code.
    pub sets: Vec<ManifestEntry>,
    /// RFC 3339 UTC generation time.
    pub generated_at: String,
}

impl Manifest {
    /// Build a manifest; entries are sorted by set code.
    #[must_use]
    pub fn new(
        model: &str,
        sets: impl IntoIterator<Item = ManifestEntry>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut sets: Vec<ManifestEntry> = sets.into_iter().collect();
        sets.sort_by(|a, b| a.set_code.cmp(&b.set_code));
        Self {
            version: FORMAT_VERSION.to_owned(),
            model: model.to_owned(),
            sets,
            generated_at: format_timestamp(generated_at),
        }
    }

    /// Total cards across all record sets.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.sets.iter().map(|s| s.card_count).sum()
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if `json` is not a manifest.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn when() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn entry_url() {
        let e = ManifestEntry::new("KS", "/ml", 12);
        assert_eq!(e.embeddings_url, "/ml/embeddings-KS.json");
        let e = ManifestEntry::new("KS", "https://cdn.example.com/ml/", 12);
        assert_eq!(
            e.embeddings_url,
            "https://cdn.example.com/ml/embeddings-KS.json"
        );
    }

    #[test]
    fn sets_are_sorted() {
        let m = Manifest::new(
            "m",
            [
                ManifestEntry::new("ST", "/ml", 1),
                ManifestEntry::new("AB", "/ml", 2),
                ManifestEntry::new("KS", "/ml", 3),
            ],
            when(),
        );
        let codes: Vec<&str> = m.sets.iter().map(|s| s.set_code.as_str()).collect();
        assert_eq!(codes, ["AB", "KS", "ST"]);
        assert_eq!(m.total_cards(), 6);
    }

    #[test]
    fn json_keys_and_indentation() {
        let m = Manifest::new("m", [ManifestEntry::new("KS", "/ml", 3)], when());
        let json = m.to_json().unwrap();
        assert!(json.contains("\n  \"version\": \"1.0.0\""));
        assert!(json.contains("\"setCode\": \"KS\""));
        assert!(json.contains("\"embeddingsUrl\": \"/ml/embeddings-KS.json\""));
        assert!(json.contains("\"cardCount\": 3"));
        assert!(json.contains("\"generatedAt\": \"2025-06-01T00:00:00.000000Z\""));
        assert_eq!(Manifest::from_json(&json).unwrap(), m);
    }

    #[test]
    fn empty_manifest() {
        let m = Manifest::new("m", [], when());
        assert!(m.sets.is_empty());
        assert_eq!(m.total_cards(), 0);
    }
}
