// Rust guideline compliant 2026-10-18

//! Eligibility engine command-line entry point -- `SQLite` storage, HTTP region
//! lookup.
//!
//! Configuration comes from the environment (see `config.rs`); an optional
//! `.env` file is read first.
//!
//! # Usage
//!
//! ```text
//! eligibility import recipients.json
//! eligibility settings set --passing-grade 0.6 --kuota 25
//! eligibility batch                  # score every recipient
//! eligibility train                  # fit and persist the KNN model
//! eligibility batch                  # score and classify every recipient
//! eligibility predict "Siti Aminah" --province 11
//! eligibility eligible
//!
//! RUST_LOG=info eligibility batch    # with lifecycle logs
//! ```
//!
//! CTRL+C during `batch` cancels the run; nothing is written in that case.

mod adapters;
mod config;

#[path = "adapters/http_region_lookup.rs"]
mod http_region_lookup;
#[path = "adapters/sqlite_repository.rs"]
mod sqlite_repository;

use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use adapters::json_model_store::JsonModelStore;
use anyhow::Context as _;
use batch::{BatchPredictionJob, JobManager, JobSnapshot, JobStatus, RunHandle};
use clap::{Parser, Subcommand};
use classifier::EligibilityClassifier;
use config::AppConfig;
use domain::{
    NewRecipient, RecipientId, RecipientQuery, RecipientRepository as _, Setting,
    SettingsRepository as _,
};
use http_region_lookup::HttpRegionLookup;
use predictor::{PredictionService, eligible_recipients};
use sqlite_repository::SqliteRepository;
use trainer::{ModelTrainer, TrainerConfig};

#[derive(Debug, Parser)]
#[command(name = "eligibility", version, about = "Social-assistance eligibility engine (SAW + KNN)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Insert recipients from a JSON array file.
    Import {
        /// Path of the JSON file.
        file: PathBuf,
    },
    /// Show or change the passing grade and quota.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Retrain the KNN model from stored scores and persist it.
    Train,
    /// Evaluate one recipient by name.
    Predict {
        name: String,
        #[arg(long)]
        province: Option<String>,
        #[arg(long)]
        regency: Option<String>,
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        village: Option<String>,
    },
    /// Score and classify recipients in the background, reporting progress.
    Batch {
        /// Restrict the run to these ids (repeatable). Default: everyone.
        #[arg(long = "id")]
        ids: Vec<i64>,
    },
    /// List eligible recipients, best first, capped at the quota.
    Eligible,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        passing_grade: Option<f64>,
        #[arg(long)]
        kuota: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("invalid configuration")?;
    let repo = Arc::new(
        SqliteRepository::new(&config.database_url)
            .await
            .with_context(|| format!("failed to open database {}", config.database_url))?,
    );
    let store = JsonModelStore::new(&config.model_path);
    // Missing or unusable artifacts leave the classifier untrained.
    let classifier = EligibilityClassifier::load_from(&store);

    match cli.command {
        Command::Import { file } => import(&repo, &file).await,
        Command::Settings { action } => settings(&repo, action).await,
        Command::Train => train(&repo, &store, &classifier, &config).await,
        Command::Predict { name, province, regency, district, village } => {
            let query = RecipientQuery { name, province, regency, district, village };
            predict(&repo, &classifier, &config, &query).await
        }
        Command::Batch { ids } => run_batch(repo, &classifier, &config, ids).await,
        Command::Eligible => eligible(&repo).await,
    }
}

fn region_service(config: &AppConfig) -> anyhow::Result<PredictionService<HttpRegionLookup>> {
    let lookup = HttpRegionLookup::new(&config.region_api_base_url, config.region_api_timeout)
        .context("failed to build region API client")?;
    Ok(PredictionService::new(lookup))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("failed to encode output")?);
    Ok(())
}

async fn import(repo: &SqliteRepository, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let recipients: Vec<NewRecipient> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of recipients", file.display()))?;
    let ids = repo.insert_many(recipients).await.context("import failed")?;
    tracing::info!("main.import: inserted={}", ids.len());
    println!("imported {} recipients", ids.len());
    Ok(())
}

async fn settings(repo: &SqliteRepository, action: SettingsAction) -> anyhow::Result<()> {
    let current = repo.load_or_init().await.context("failed to read settings")?;
    match action {
        SettingsAction::Show => print_json(&current),
        SettingsAction::Set { passing_grade, kuota } => {
            let updated = Setting::new(
                passing_grade.unwrap_or(current.passing_grade),
                kuota.unwrap_or(current.kuota),
            )
            .context("rejected setting")?;
            repo.save(updated).await.context("failed to save settings")?;
            print_json(&updated)
        }
    }
}

async fn train(
    repo: &SqliteRepository,
    store: &JsonModelStore,
    classifier: &EligibilityClassifier,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let setting = repo.load_or_init().await.context("failed to read settings")?;
    let recipients = repo.all().await.context("failed to read recipients")?;
    let mut trainer_config = TrainerConfig::builder();
    if let Some(seed) = config.training_seed {
        trainer_config = trainer_config.seed(seed);
    }
    let trainer = ModelTrainer::new(trainer_config.build().context("invalid trainer config")?);
    let outcome = trainer
        .train(&recipients, setting.passing_grade, store)
        .context("training failed")?;
    classifier.reload(store).context("failed to reload trained model")?;

    println!(
        "trained k={} on {} samples ({} unscored excluded), saved to {}",
        outcome.model.k(),
        outcome.samples,
        outcome.excluded,
        store.path().display()
    );
    match outcome.report {
        Some(report) => println!("{report}"),
        None => println!("single label class: evaluation skipped"),
    }
    Ok(())
}

async fn predict(
    repo: &SqliteRepository,
    classifier: &EligibilityClassifier,
    config: &AppConfig,
    query: &RecipientQuery,
) -> anyhow::Result<()> {
    let setting = repo.load_or_init().await.context("failed to read settings")?;
    let service = region_service(config)?;
    let model = classifier.snapshot();
    let response = service
        .predict_one(repo, query, model.as_deref(), setting.passing_grade)
        .await
        .context("prediction failed")?;
    print_json(&response)
}

async fn run_batch(
    repo: Arc<SqliteRepository>,
    classifier: &EligibilityClassifier,
    config: &AppConfig,
    ids: Vec<i64>,
) -> anyhow::Result<()> {
    let setting = repo.load_or_init().await.context("failed to read settings")?;
    let ids: Vec<RecipientId> = if ids.is_empty() {
        repo.all().await.context("failed to read recipients")?.iter().map(|r| r.id).collect()
    } else {
        ids.into_iter().map(RecipientId).collect()
    };

    let manager = JobManager::new();
    let job = BatchPredictionJob::new(repo, Arc::new(region_service(config)?));
    let handle = manager
        .start(job, ids, setting.passing_grade, classifier.snapshot())
        .context("failed to start batch")?;
    tracing::info!("main.batch: started run_id={}", handle.run_id);

    let snap = watch_batch(&manager, handle, config.progress_interval, tokio::signal::ctrl_c()).await;
    print_json(&snap)?;
    if snap.status == JobStatus::Error {
        anyhow::bail!("batch failed: {}", snap.error.unwrap_or_default());
    }
    Ok(())
}

/// Report progress every `interval` until the run ends and return its final
/// snapshot. The first completion of `shutdown` cancels the run; it is not
/// polled again afterwards.
async fn watch_batch<T>(
    manager: &JobManager,
    handle: RunHandle,
    interval: Duration,
    shutdown: impl Future<Output = T>,
) -> JobSnapshot {
    let mut ticker = tokio::time::interval(interval);
    let mut done = pin!(handle.wait());
    let mut shutdown = pin!(shutdown);
    let mut cancel_requested = false;
    loop {
        tokio::select! {
            () = &mut done => break,
            _ = ticker.tick() => {
                let snap = manager.snapshot();
                eprintln!(
                    "{:>3}% {}/{} elapsed={:.1}s remaining={}",
                    snap.percentage,
                    snap.processed,
                    snap.total,
                    snap.elapsed_secs,
                    snap.estimated_remaining_secs.map_or_else(|| "?".to_owned(), |s| format!("{s:.1}s")),
                );
            }
            _ = &mut shutdown, if !cancel_requested => {
                tracing::info!("main.shutdown: ctrl_c received, cancelling batch");
                cancel_requested = true;
                manager.cancel();
            }
        }
    }
    manager.snapshot()
}

async fn eligible(repo: &SqliteRepository) -> anyhow::Result<()> {
    let setting = repo.load_or_init().await.context("failed to read settings")?;
    let recipients = repo.all().await.context("failed to read recipients")?;
    let listed = eligible_recipients(recipients, &setting);
    tracing::info!(
        "main.eligible: listed={} passing_grade={} kuota={}",
        listed.len(),
        setting.passing_grade,
        setting.kuota
    );
    print_json(&listed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
