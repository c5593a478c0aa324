//! Per-set fingerprinting across a bounded worker pool.
//!
//! Cards are independent, so they are fingerprinted in parallel; the
//! stages of one card always run sequentially on one worker. Results are
//! collected in catalog order regardless of which card finishes first.

use cardprint_pipeline::diagnostics::{Clock, fingerprint_with_diagnostics};
use cardprint_pipeline::{ErrorKind, FeatureExtractor, FingerprintConfig, FingerprintRecord};
use log::{debug, info, warn};
use rayon::ThreadPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogCard;
use crate::source::ImageSource;

/// A card that produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skip {
    pub set_code: String,
    pub card_id: String,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Outcome of fingerprinting one set.
#[derive(Debug, Clone, Default)]
pub struct SetOutcome {
    /// Records of the cards that succeeded, in catalog order.
    pub records: Vec<FingerprintRecord>,
    /// Cards that failed, in catalog order.
    pub skips: Vec<Skip>,
}

/// Runs the pipeline for every card of a set.
pub struct Orchestrator<'a, C> {
    config: &'a FingerprintConfig,
    extractor: &'a dyn FeatureExtractor,
    source: &'a dyn ImageSource,
    clock: &'a C,
    pool: ThreadPool,
    log_diagnostics: bool,
}

impl<'a, C: Clock + Sync> Orchestrator<'a, C> {
    #[must_use]
    pub fn new(
        config: &'a FingerprintConfig,
        extractor: &'a dyn FeatureExtractor,
        source: &'a dyn ImageSource,
        clock: &'a C,
        pool: ThreadPool,
    ) -> Self {
        Self {
            config,
            extractor,
            source,
            clock,
            pool,
            log_diagnostics: false,
        }
    }

    /// Log each card's stage report at `info` instead of `debug`.
    #[must_use]
    pub const fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.log_diagnostics = enabled;
        self
    }

    /// Fingerprint `cards`, isolating per-card failures as skips.
    #[must_use]
    pub fn run_set(&self, set_code: &str, cards: &[&CatalogCard]) -> SetOutcome {
        info!(
            "set {set_code}: fingerprinting {} cards on {} workers",
            cards.len(),
            self.pool.current_num_threads()
        );

        let results: Vec<_> = self.pool.install(|| {
            cards
                .par_iter()
                .map(|card| (card, self.fingerprint_card(card)))
                .collect()
        });

        let mut outcome = SetOutcome::default();
        for (card, result) in results {
            match result {
                Ok(record) => outcome.records.push(record),
                Err(err) => {
                    warn!("set {set_code}: skipping {} ({:?}): {err}", card.id, err.kind());
                    outcome.skips.push(Skip {
                        set_code: set_code.to_owned(),
                        card_id: card.id.clone(),
                        kind: err.kind(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            "set {set_code}: {} fingerprinted, {} skipped",
            outcome.records.len(),
            outcome.skips.len()
        );
        outcome
    }

    fn fingerprint_card(
        &self,
        card: &CatalogCard,
    ) -> Result<FingerprintRecord, cardprint_pipeline::PipelineError> {
        let bytes = self.source.fetch(card)?;
        let (record, diagnostics) = fingerprint_with_diagnostics(
            bytes,
            &card.id,
            card.group.clone(),
            self.config,
            self.extractor,
            self.clock,
        )?;
        if self.log_diagnostics {
            info!("{}", diagnostics.report());
        } else {
            debug!("{}", diagnostics.report());
        }
        Ok(record)
    }
}
