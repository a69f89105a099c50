// Rust guideline compliant 2026-10-18

//! Offline end-to-end demo of the eligibility engine.
//!
//! Seeds an in-memory repository with synthetic recipients and walks the full
//! lifecycle against a fixed region table:
//!
//! 1. score-only batch (no model yet),
//! 2. train and persist the KNN model,
//! 3. classified batch,
//! 4. single-recipient prediction,
//! 5. eligible listing.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin eligibility_demo
//! RUST_LOG=debug cargo run --bin eligibility_demo   # per-recipient output
//! ```

mod adapters;

// Demo-only adapters live in this binary's module tree only, which keeps
// dead_code quiet in the `eligibility` binary.
#[path = "adapters/demo_regions.rs"]
mod demo_regions;
#[path = "adapters/in_memory_repository.rs"]
mod in_memory_repository;

use std::sync::Arc;

use adapters::json_model_store::JsonModelStore;
use anyhow::Context as _;
use batch::{BatchPredictionJob, JobManager, JobSnapshot, JobStatus};
use classifier::{EligibilityClassifier, KnnModel};
use demo_regions::{DEMO_LOCATIONS, DemoRegionLookup};
use domain::{
    Criteria, EligibilityLabel, Location, NewRecipient, RecipientId, RecipientQuery,
    RecipientRepository as _, SettingsRepository as _,
};
use in_memory_repository::InMemoryRepository;
use predictor::{PredictionService, eligible_recipients};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng as _};
use trainer::{ModelTrainer, TrainerConfig};

// ---------------------------------------------------------------------------
// Demo parameters
// ---------------------------------------------------------------------------

const RECIPIENTS: usize = 40;
const DEMO_SEED: u64 = 2024;

const FIRST_NAMES: &[&str] = &[
    "Siti", "Budi", "Dewi", "Agus", "Rina", "Joko", "Wati", "Andi", "Sri", "Hendra",
];
const LAST_NAMES: &[&str] = &[
    "Aminah", "Santoso", "Lestari", "Wijaya", "Rahmawati", "Saputra", "Hidayat", "Kusuma",
];
const OCCUPATIONS: &[&str] = &["Petani", "Buruh", "Pedagang", "Nelayan", "Tidak bekerja"];

fn pick<'a>(rng: &mut impl Rng, pool: &[&'a str]) -> &'a str {
    pool[rng.random_range(0..pool.len())]
}

fn synthetic_recipients(rng: &mut impl Rng, count: usize) -> Vec<NewRecipient> {
    (0..count)
        .map(|_| {
            let (province, regency, district, village) =
                DEMO_LOCATIONS[rng.random_range(0..DEMO_LOCATIONS.len())];
            NewRecipient {
                name: format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES)),
                national_id: Some(
                    rng.random_range(1_000_000_000_000_000_u64..10_000_000_000_000_000).to_string(),
                ),
                location: Location {
                    province: province.to_owned(),
                    regency: regency.to_owned(),
                    district: district.to_owned(),
                    village: village.to_owned(),
                },
                occupation: pick(rng, OCCUPATIONS).to_owned(),
                criteria: Criteria {
                    dtks: rng.random_bool(0.4),
                    extreme_poverty: rng.random_bool(0.5),
                    loss_of_livelihood: rng.random_bool(0.4),
                    unemployed: rng.random_bool(0.4),
                    disability: rng.random_bool(0.2),
                    chronic_illness: rng.random_bool(0.3),
                    single_elderly_household: rng.random_bool(0.2),
                    pkh: rng.random_bool(0.25),
                    pre_employment_card: rng.random_bool(0.15),
                    bst: rng.random_bool(0.2),
                    other_social_aid: rng.random_bool(0.15),
                },
            }
        })
        .collect()
}

/// Run one batch to completion and return its final snapshot.
async fn run_batch(
    manager: &JobManager,
    job: BatchPredictionJob<InMemoryRepository, DemoRegionLookup>,
    ids: Vec<RecipientId>,
    passing_grade: f64,
    model: Option<Arc<KnnModel>>,
) -> anyhow::Result<JobSnapshot> {
    let handle = manager.start(job, ids, passing_grade, model).context("failed to start batch")?;
    handle.wait().await;
    let snap = manager.snapshot();
    if snap.status == JobStatus::Error {
        anyhow::bail!("batch failed: {}", snap.error.unwrap_or_default());
    }
    Ok(snap)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut rng = StdRng::seed_from_u64(DEMO_SEED);
    let repo = Arc::new(InMemoryRepository::new());
    let ids = repo.insert_many(synthetic_recipients(&mut rng, RECIPIENTS));
    let setting = repo.load_or_init().await.context("failed to read settings")?;
    tracing::info!(
        "demo.seed: recipients={} passing_grade={} kuota={}",
        ids.len(),
        setting.passing_grade,
        setting.kuota
    );

    let service = Arc::new(PredictionService::new(DemoRegionLookup));
    let job = BatchPredictionJob::new(Arc::clone(&repo), Arc::clone(&service));
    let manager = JobManager::new();

    // -- 1. Score-only pass: no model, every label is Unscored --
    let snap = run_batch(&manager, job.clone(), ids.clone(), setting.passing_grade, None).await?;
    tracing::info!("demo.score_only: status={:?} updated={}", snap.status, snap.updated);

    // -- 2. Train on the stored scores and persist the artifact --
    let store =
        JsonModelStore::new(std::env::temp_dir().join("eligibility_demo").join("knn_model.json"));
    let trainer = ModelTrainer::new(
        TrainerConfig::builder().seed(DEMO_SEED).build().context("invalid trainer config")?,
    );
    let recipients = repo.all().await.context("failed to read recipients")?;
    let outcome = trainer
        .train(&recipients, setting.passing_grade, &store)
        .context("training failed")?;
    let classifier = EligibilityClassifier::empty();
    classifier.reload(&store).context("failed to reload trained model")?;
    tracing::info!(
        "demo.train: k={} samples={} path={}",
        outcome.model.k(),
        outcome.samples,
        store.path().display()
    );
    if let Some(report) = outcome.report {
        println!("{report}");
    }

    // -- 3. Classified pass with the fresh model --
    let snap = run_batch(&manager, job, ids, setting.passing_grade, classifier.snapshot()).await?;
    tracing::info!(
        "demo.classified: status={:?} updated={} elapsed={:.3}s cached_endpoints={}",
        snap.status,
        snap.updated,
        snap.elapsed_secs,
        service.resolver().cached_endpoints()
    );

    // -- 4. Single prediction for the first recipient --
    if let Some(first) = recipients.first() {
        let model = classifier.snapshot();
        let response = service
            .predict_one(
                repo.as_ref(),
                &RecipientQuery::by_name(&first.name),
                model.as_deref(),
                setting.passing_grade,
            )
            .await
            .context("prediction failed")?;
        println!("{}", serde_json::to_string_pretty(&response).context("failed to encode prediction")?);
    }

    // -- 5. Eligible listing --
    let listed = eligible_recipients(repo.all().await.context("failed to read recipients")?, &setting);
    tracing::info!("demo.eligible: listed={}", listed.len());
    for r in &listed {
        println!(
            "{:>4} {:<24} score={:.4} label={}",
            r.id,
            r.name,
            r.saw_score.unwrap_or_default(),
            r.label.map_or("-", EligibilityLabel::as_str)
        );
    }
    Ok(())
}
