//! cardprint: generate artwork fingerprint record sets for a card catalog.
//!
//! Reads a card catalog, loads each card's image from a local directory,
//! fingerprints the cards in parallel, and writes one record set per card
//! set plus a manifest.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin cardprint -- [OPTIONS] --image-dir <DIR> <CATALOG>
//! ```
//!
//! Logging goes to stderr through `env_logger` (default level `info`,
//! override with `RUST_LOG`).

mod catalog;
mod error;
#[cfg(feature = "onnx")]
mod onnx;
mod orchestrator;
mod output;
mod source;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use cardprint_export::{Manifest, ManifestEntry, RecordSet};
use cardprint_pipeline::diagnostics::Clock;
use cardprint_pipeline::{EMBEDDING_DIM, FeatureExtractor, FingerprintConfig, ProjectionExtractor};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use rayon::ThreadPoolBuilder;

use crate::catalog::{Catalog, DEFAULT_SET_CODE};
use crate::error::CliError;
use crate::orchestrator::Orchestrator;
use crate::source::DirectorySource;

/// Generate artwork fingerprints for every card of a catalog.
///
/// Writes `embeddings-{SET}.json` for each card set and `manifest.json`
/// into the output directory. Cards whose image is missing or unusable are
/// skipped and reported; they never abort the run.
#[derive(Parser)]
#[command(name = "cardprint", version)]
struct Cli {
    /// Card catalog: a JSON array of `{id, imageUrl?, set?, group?}`.
    catalog: PathBuf,

    /// Directory holding card images named `{id}.{jpg,jpeg,png,webp}`.
    #[arg(long)]
    image_dir: PathBuf,

    /// Output directory for record sets and the manifest.
    #[arg(long, default_value = "public/ml")]
    out_dir: PathBuf,

    /// URL prefix under which the record sets are served.
    #[arg(long, default_value = "/ml")]
    url_prefix: String,

    /// Set code for cards that do not name one.
    #[arg(long, default_value = DEFAULT_SET_CODE)]
    default_set: String,

    /// Feature extractor.
    #[arg(long, value_enum, default_value_t = ExtractorKind::Projection)]
    extractor: ExtractorKind,

    /// ONNX model file (required with `--extractor onnx`).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Identifier recorded in the output instead of the extractor's own.
    #[arg(long)]
    model_id: Option<String>,

    /// Embedding dimensionality.
    #[arg(long, default_value_t = EMBEDDING_DIM, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    embedding_dim: usize,

    /// Seed of the projection extractor's weights.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Tile side length in pixels.
    #[arg(long, default_value_t = FingerprintConfig::DEFAULT_INPUT_SIZE, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    input_size: u32,

    /// Base seed for the pixel-noise augmentation views.
    #[arg(long, default_value_t = FingerprintConfig::DEFAULT_NOISE_SEED)]
    noise_seed: u64,

    /// Full fingerprint config as a JSON string.
    ///
    /// When provided, `--input-size` and `--noise-seed` are ignored. The
    /// JSON must be a valid `FingerprintConfig` serialization; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Number of worker threads (0 = one per logical CPU).
    #[arg(long, short = 'j', default_value_t = 0)]
    jobs: usize,

    /// Write the skipped cards as JSON to this file.
    #[arg(long)]
    skips_json: Option<PathBuf>,

    /// Log every card's per-stage diagnostics at info level.
    #[arg(long)]
    diagnostics: bool,
}

/// Feature extractor selection.
#[derive(Clone, Copy, ValueEnum)]
enum ExtractorKind {
    /// Seeded random projection of pooled pixels; needs no model file.
    Projection,
    /// Frozen ONNX model (requires the `onnx` feature).
    Onnx,
}

/// Build a [`FingerprintConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual config flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<FingerprintConfig, CliError> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(CliError::Config);
    }

    Ok(FingerprintConfig {
        input_size: cli.input_size,
        noise_seed: cli.noise_seed,
        ..FingerprintConfig::default()
    })
}

fn extractor_from_cli(
    cli: &Cli,
    config: &FingerprintConfig,
) -> Result<Box<dyn FeatureExtractor>, CliError> {
    match cli.extractor {
        ExtractorKind::Projection => {
            let mut extractor = ProjectionExtractor::new(cli.seed, cli.embedding_dim);
            if let Some(ref id) = cli.model_id {
                extractor = extractor.with_identifier(id.clone());
            }
            Ok(Box::new(extractor))
        }
        ExtractorKind::Onnx => onnx_extractor(cli, config),
    }
}

#[cfg(feature = "onnx")]
fn onnx_extractor(
    cli: &Cli,
    config: &FingerprintConfig,
) -> Result<Box<dyn FeatureExtractor>, CliError> {
    let path = cli
        .model
        .as_deref()
        .ok_or_else(|| CliError::Extractor("--extractor onnx requires --model".to_owned()))?;
    let identifier = cli
        .model_id
        .clone()
        .unwrap_or_else(|| onnx::DEFAULT_MODEL_ID.to_owned());
    info!("loading ONNX model {}", path.display());
    let extractor = onnx::OnnxExtractor::load(
        path,
        identifier,
        cli.embedding_dim,
        cardprint_pipeline::VIEW_COUNT,
        config.input_size,
    )?;
    Ok(Box::new(extractor))
}

#[cfg(not(feature = "onnx"))]
fn onnx_extractor(
    cli: &Cli,
    _config: &FingerprintConfig,
) -> Result<Box<dyn FeatureExtractor>, CliError> {
    if let Some(ref model) = cli.model {
        warn!("ignoring --model {}", model.display());
    }
    Err(CliError::Extractor(
        "this build has no ONNX support; rebuild with --features onnx".to_owned(),
    ))
}

fn run(cli: &Cli) -> Result<usize, CliError> {
    let config = config_from_cli(cli)?;
    let catalog = Catalog::load(&cli.catalog)?;
    let extractor = extractor_from_cli(cli, &config)?;
    let source = DirectorySource::new(&cli.image_dir);
    let pool = ThreadPoolBuilder::new().num_threads(cli.jobs).build()?;

    if catalog.is_empty() {
        warn!("catalog {} has no cards", cli.catalog.display());
    }
    let sets = catalog.by_set(&cli.default_set);
    info!(
        "{} cards across {} set(s): {}",
        catalog.len(),
        sets.len(),
        sets.keys().copied().collect::<Vec<_>>().join(", ")
    );
    info!(
        "extractor {} ({} dims), images from {}",
        extractor.identifier(),
        extractor.embedding_dim(),
        source.root().display()
    );

    let orchestrator = Orchestrator::new(&config, extractor.as_ref(), &source, &StdClock, pool)
        .with_diagnostics(cli.diagnostics);

    let started = Instant::now();
    let mut entries = Vec::with_capacity(sets.len());
    let mut skips = Vec::new();
    for (set_code, cards) in &sets {
        let outcome = orchestrator.run_set(set_code, cards);
        let record_set = RecordSet::from_records(
            outcome.records,
            extractor.identifier(),
            extractor.embedding_dim(),
            Utc::now(),
        )?;
        output::write_record_set(&cli.out_dir, set_code, &record_set)?;
        entries.push(ManifestEntry::new(
            set_code,
            &cli.url_prefix,
            record_set.card_count,
        ));
        skips.extend(outcome.skips);
    }

    let manifest = Manifest::new(extractor.identifier(), entries, Utc::now());
    output::write_manifest(&cli.out_dir, &manifest)?;

    if let Some(ref path) = cli.skips_json {
        output::write_skips(path, &skips)?;
    }

    let elapsed = started.elapsed();
    info!(
        "done: {} sets, {} cards fingerprinted, {} skipped in {:.1}s",
        manifest.sets.len(),
        manifest.total_cards(),
        skips.len(),
        elapsed.as_secs_f64()
    );
    Ok(skips.len())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(skipped) => {
            warn!("{skipped} card(s) skipped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["cardprint", "--image-dir", "imgs", "cards.json"]);
        assert_eq!(cli.out_dir, PathBuf::from("public/ml"));
        assert_eq!(cli.url_prefix, "/ml");
        assert_eq!(cli.default_set, "KS");
        assert_eq!(cli.embedding_dim, EMBEDDING_DIM);
        assert_eq!(config_from_cli(&cli).unwrap(), FingerprintConfig::default());
    }

    #[test]
    fn config_flags() {
        let cli = Cli::parse_from([
            "cardprint",
            "--image-dir",
            "imgs",
            "--input-size",
            "128",
            "--noise-seed",
            "7",
            "cards.json",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.input_size, 128);
        assert_eq!(config.noise_seed, 7);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::parse_from([
            "cardprint",
            "--image-dir",
            "imgs",
            "--input-size",
            "128",
            "--config-json",
            r#"{"noise_seed": 3}"#,
            "cards.json",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.noise_seed, 3);
        assert_eq!(config.input_size, FingerprintConfig::DEFAULT_INPUT_SIZE);
    }

    #[test]
    fn bad_config_json() {
        let cli = Cli::parse_from([
            "cardprint",
            "--image-dir",
            "imgs",
            "--config-json",
            "{",
            "cards.json",
        ]);
        assert!(matches!(config_from_cli(&cli), Err(CliError::Config(_))));
    }

    #[test]
    fn projection_extractor_identifier() {
        let cli = Cli::parse_from(["cardprint", "--image-dir", "i", "--seed", "4", "c.json"]);
        let config = config_from_cli(&cli).unwrap();
        let extractor = extractor_from_cli(&cli, &config).unwrap();
        assert_eq!(extractor.identifier(), "projection_d1280_seed4");
        assert_eq!(extractor.embedding_dim(), EMBEDDING_DIM);

        let cli = Cli::parse_from([
            "cardprint",
            "--image-dir",
            "i",
            "--model-id",
            "mobilenet_v3_large_100_224_mock",
            "c.json",
        ]);
        let extractor = extractor_from_cli(&cli, &config).unwrap();
        assert_eq!(extractor.identifier(), "mobilenet_v3_large_100_224_mock");
    }

    #[test]
    fn end_to_end_run() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let image_dir = root.join("images");
        std::fs::create_dir_all(&image_dir).unwrap();
        let img = cardprint_pipeline::RgbImage::from_fn(50, 70, |x, y| {
            image::Rgb([u8::try_from(x * 5).unwrap(), u8::try_from(y * 3).unwrap(), 90])
        });
        img.save(image_dir.join("KS-001.png")).unwrap();
        std::fs::write(image_dir.join("ST-001.png"), b"not an image").unwrap();
        let catalog = root.join("cards.json");
        std::fs::write(
            &catalog,
            r#"[{"id":"KS-001","group":"red"},{"id":"KS-002"},{"id":"ST-001","set":"ST"}]"#,
        )
        .unwrap();

        let out_dir = root.join("out");
        let skips_path = root.join("skips.json");
        let args: Vec<std::ffi::OsString> = vec![
            "cardprint".into(),
            "--image-dir".into(),
            image_dir.clone().into(),
            "--out-dir".into(),
            out_dir.clone().into(),
            "--embedding-dim".into(),
            "16".into(),
            "--input-size".into(),
            "32".into(),
            "--jobs".into(),
            "2".into(),
            "--skips-json".into(),
            skips_path.clone().into(),
            catalog.into(),
        ];
        let cli = Cli::parse_from(args);

        assert_eq!(run(&cli).unwrap(), 2);

        let ks = RecordSet::from_json(
            &std::fs::read_to_string(out_dir.join("embeddings-KS.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(ks.card_count, 1);
        assert_eq!(ks.entries[0].card_code, "KS-001");
        assert_eq!(ks.entries[0].group.as_deref(), Some("red"));
        assert_eq!(ks.entries[0].embedding.len(), 16);

        let st = RecordSet::from_json(
            &std::fs::read_to_string(out_dir.join("embeddings-ST.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(st.card_count, 0);

        let manifest =
            Manifest::from_json(&std::fs::read_to_string(out_dir.join("manifest.json")).unwrap())
                .unwrap();
        let codes: Vec<&str> = manifest.sets.iter().map(|s| s.set_code.as_str()).collect();
        assert_eq!(codes, ["KS", "ST"]);
        assert_eq!(manifest.sets[0].embeddings_url, "/ml/embeddings-KS.json");

        let skips: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&skips_path).unwrap()).unwrap();
        assert_eq!(skips[0]["cardId"], "KS-002");
        assert_eq!(skips[0]["kind"], "AcquisitionFailure");
        assert_eq!(skips[1]["cardId"], "ST-001");
        assert_eq!(skips[1]["kind"], "InvalidImage");
    }
}
