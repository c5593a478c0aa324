//! Card catalog: the list of cards to fingerprint.
//!
//! The catalog is a JSON array of card objects. Only `id` is required;
//! unknown fields are ignored.
//!
//! ```json
//! [{"id": "KS-001", "imageUrl": "https://…", "set": "KS", "group": "red"}]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// Set code used for cards that do not name one.
pub const DEFAULT_SET_CODE: &str = "KS";

/// One catalog card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCard {
    /// Card identifier, also the image file stem.
    pub id: String,
    /// Where the image was published. Informational; images are read
    /// from the local image directory.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Set code.
    #[serde(default)]
    pub set: Option<String>,
    /// Grouping tag copied into the record.
    #[serde(default)]
    pub group: Option<String>,
}

/// Parsed card catalog, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    cards: Vec<CatalogCard>,
}

impl Catalog {
    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Returns the parse error if `json` is not an array of cards.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            cards: serde_json::from_str(json)?,
        })
    }

    /// Read and parse the catalog file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Io`] if the file cannot be read and
    /// [`CliError::Catalog`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let json = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        Self::from_json(&json).map_err(|source| CliError::Catalog {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards grouped by set code, sets in sorted order, cards in catalog
    /// order within each set.
    #[must_use]
    pub fn by_set<'a>(&'a self, default_set: &'a str) -> BTreeMap<&'a str, Vec<&'a CatalogCard>> {
        let mut sets: BTreeMap<&str, Vec<&CatalogCard>> = BTreeMap::new();
        for card in &self.cards {
            let code = card.set.as_deref().unwrap_or(default_set);
            sets.entry(code).or_default().push(card);
        }
        sets
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {"id": "ST-002", "set": "ST", "imageUrl": "https://cards.example/ST-002.webp"},
        {"id": "KS-001", "set": "KS", "group": "red", "rarity": "C"},
        {"id": "X-1"},
        {"id": "ST-001", "set": "ST"}
    ]"#;

    #[test]
    fn parses_optional_fields() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 4);
        let sets = catalog.by_set(DEFAULT_SET_CODE);
        let ks = sets["KS"][0];
        assert_eq!(ks.group.as_deref(), Some("red"));
        assert_eq!(ks.image_url, None);
        assert_eq!(
            sets["ST"][0].image_url.as_deref(),
            Some("https://cards.example/ST-002.webp")
        );
    }

    #[test]
    fn groups_by_set_in_sorted_order() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let sets = catalog.by_set(DEFAULT_SET_CODE);
        let codes: Vec<&str> = sets.keys().copied().collect();
        assert_eq!(codes, ["KS", "ST"]);

        let ks: Vec<&str> = sets["KS"].iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ks, ["KS-001", "X-1"]);
        // Catalog order is kept within a set.
        let st: Vec<&str> = sets["ST"].iter().map(|c| c.id.as_str()).collect();
        assert_eq!(st, ["ST-002", "ST-001"]);
    }

    #[test]
    fn custom_default_set() {
        let catalog = Catalog::from_json(r#"[{"id": "a"}]"#).unwrap();
        assert!(catalog.by_set("PR").contains_key("PR"));
    }

    #[test]
    fn rejects_non_array() {
        assert!(Catalog::from_json(r#"{"id": "a"}"#).is_err());
        assert!(Catalog::from_json(r#"[{"set": "KS"}]"#).is_err());
    }

    #[test]
    fn empty_catalog() {
        let catalog = Catalog::from_json("[]").unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.by_set(DEFAULT_SET_CODE).is_empty());
    }
}
