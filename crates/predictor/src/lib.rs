// Rust guideline compliant 2026-10-15

//! Single-recipient prediction: SAW score, KNN label, factor breakdown and
//! resolved region names merged into one [`PredictionResult`].
//!
//! Entry points: [`PredictionService::evaluate`],
//! [`PredictionService::predict_one`], [`eligible_recipients`].
//! Region codes are translated by the memoizing [`RegionNameResolver`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use classifier::{ClassifierOutcome, KnnModel, classify_with};
use domain::{
    EligibilityLabel, Location, Recipient, RecipientId, RecipientQuery, RecipientRepository,
    RegionLookup, RepositoryError, ScoreUpdate, Setting,
};
use scoring::{compute_score, vectorize};
use serde::Serialize;

/// Format of [`PredictionResult::generated_at`] (local time).
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

// ---------------------------------------------------------------------------
// RegionNameResolver
// ---------------------------------------------------------------------------

/// Location with codes replaced by display names where lookup succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLocation {
    pub province: String,
    pub regency: String,
    pub district: String,
    pub village: String,
}

/// Translates region codes to names through a [`RegionLookup`], caching whole
/// endpoint responses for the life of the resolver.
///
/// Failed lookups are not cached; the raw code is returned instead.
#[derive(Debug)]
pub struct RegionNameResolver<L> {
    lookup: L,
    cache: Mutex<HashMap<String, Arc<HashMap<String, String>>>>,
}

impl<L: RegionLookup> RegionNameResolver<L> {
    /// Create a resolver with an empty cache.
    #[must_use]
    pub fn new(lookup: L) -> Self {
        Self { lookup, cache: Mutex::new(HashMap::new()) }
    }

    /// Name of `code` in the list behind `endpoint`, or `code` itself when the
    /// lookup fails or the code is unknown.
    pub async fn name_of(&self, endpoint: &str, code: &str) -> String {
        if code.is_empty() {
            return String::new();
        }
        let Some(names) = self.endpoint(endpoint).await else {
            return code.to_owned();
        };
        names.get(code).cloned().unwrap_or_else(|| code.to_owned())
    }

    /// Resolve all four levels of `location`.
    ///
    /// Each level is looked up under its parent's code.
    pub async fn resolve(&self, location: &Location) -> ResolvedLocation {
        ResolvedLocation {
            province: self.name_of("provinces.json", &location.province).await,
            regency: self
                .name_of(&format!("regencies/{}.json", location.province), &location.regency)
                .await,
            district: self
                .name_of(&format!("districts/{}.json", location.regency), &location.district)
                .await,
            village: self
                .name_of(&format!("villages/{}.json", location.district), &location.village)
                .await,
        }
    }

    /// Number of cached endpoint responses.
    #[must_use]
    pub fn cached_endpoints(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn endpoint(&self, endpoint: &str) -> Option<Arc<HashMap<String, String>>> {
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(names) = cache.get(endpoint) {
                return Some(Arc::clone(names));
            }
        }
        match self.lookup.fetch(endpoint).await {
            Ok(regions) => {
                let names: Arc<HashMap<String, String>> =
                    Arc::new(regions.into_iter().map(|r| (r.id, r.name)).collect());
                tracing::debug!("region.lookup: cached endpoint={endpoint} entries={}", names.len());
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(endpoint.to_owned(), Arc::clone(&names));
                Some(names)
            }
            Err(e) => {
                tracing::warn!("region.lookup.failed: endpoint={endpoint} error={e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PredictionResult / PredictionResponse
// ---------------------------------------------------------------------------

/// Why a recipient scored the way they did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reasons {
    /// DTKS registration flag.
    pub dtks: bool,
    /// Labels of factors that raised the score, DTKS first.
    pub contributing: Vec<&'static str>,
    /// Labels of factors that lowered the score.
    pub reducing: Vec<&'static str>,
}

/// Unified verdict for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub id: RecipientId,
    pub name: String,
    pub location: ResolvedLocation,
    pub raw_score: u32,
    pub normalized_score: f64,
    /// KNN label, or a soft status when no label could be produced.
    pub classification: ClassifierOutcome,
    /// Passing grade the result was computed against.
    pub passing_grade: f64,
    /// Whether `normalized_score >= passing_grade`.
    pub meets_passing_grade: bool,
    pub reasons: Reasons,
    /// Generation time, [`TIMESTAMP_FORMAT`].
    pub generated_at: String,
}

impl PredictionResult {
    /// Derived fields to write back; a missing label is stored as `Unscored`.
    #[must_use]
    pub fn score_update(&self) -> ScoreUpdate {
        ScoreUpdate {
            id: self.id,
            saw_score: self.normalized_score,
            label: self.classification.label().unwrap_or(EligibilityLabel::Unscored),
        }
    }
}

/// Response of [`PredictionService::predict_one`]: either a result or a soft
/// error serialized as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Found(Box<PredictionResult>),
    Error { error: String },
}

// ---------------------------------------------------------------------------
// PredictionService
// ---------------------------------------------------------------------------

/// Combines score calculation, vectorization and classification for one
/// recipient.
#[derive(Debug)]
pub struct PredictionService<L> {
    resolver: RegionNameResolver<L>,
}

impl<L: RegionLookup> PredictionService<L> {
    /// Create a service owning a fresh region cache.
    #[must_use]
    pub fn new(lookup: L) -> Self {
        Self { resolver: RegionNameResolver::new(lookup) }
    }

    /// The region resolver shared by every prediction of this service.
    #[must_use]
    pub const fn resolver(&self) -> &RegionNameResolver<L> {
        &self.resolver
    }

    /// Evaluate `recipient` against `model` and `passing_grade`.
    ///
    /// Never fails: classifier and lookup problems become soft values.
    pub async fn evaluate(
        &self,
        recipient: &Recipient,
        model: Option<&KnnModel>,
        passing_grade: f64,
    ) -> PredictionResult {
        let score = compute_score(&recipient.criteria);
        let classification = classify_with(model, &vectorize(&recipient.criteria));
        let location = self.resolver.resolve(&recipient.location).await;
        tracing::debug!(
            "predictor.evaluate: id={} normalized={} classification={classification}",
            recipient.id,
            score.normalized
        );
        PredictionResult {
            id: recipient.id,
            name: recipient.name.clone(),
            location,
            raw_score: score.raw,
            normalized_score: score.normalized,
            classification,
            passing_grade,
            meets_passing_grade: score.normalized >= passing_grade,
            reasons: Reasons {
                dtks: recipient.criteria.dtks,
                contributing: score.contributing,
                reducing: score.reducing,
            },
            generated_at: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Look up a recipient by name (and optional location filters) and
    /// evaluate it. When several recipients match, the lowest id wins.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the repository fails. An unknown
    /// recipient is a soft [`PredictionResponse::Error`], not an `Err`.
    pub async fn predict_one<R: RecipientRepository>(
        &self,
        repo: &R,
        query: &RecipientQuery,
        model: Option<&KnnModel>,
        passing_grade: f64,
    ) -> Result<PredictionResponse, RepositoryError> {
        let matches = repo.find_by_name(query).await?;
        let Some(recipient) = matches.iter().min_by_key(|r| r.id) else {
            tracing::info!("predictor.predict_one: not found name={:?}", query.name);
            return Ok(PredictionResponse::Error {
                error: format!("Recipient '{}' not found", query.name),
            });
        };
        if matches.len() > 1 {
            tracing::debug!(
                "predictor.predict_one: {} matches for name={:?}, using id={}",
                matches.len(),
                query.name,
                recipient.id
            );
        }
        let result = self.evaluate(recipient, model, passing_grade).await;
        Ok(PredictionResponse::Found(Box::new(result)))
    }
}

// ---------------------------------------------------------------------------
// Eligible listing
// ---------------------------------------------------------------------------

/// Recipients whose stored score reaches the passing grade, best first (ties by
/// ascending id), capped at the quota. Unscored recipients never qualify.
#[must_use]
pub fn eligible_recipients(recipients: Vec<Recipient>, setting: &Setting) -> Vec<Recipient> {
    let mut eligible: Vec<Recipient> = recipients
        .into_iter()
        .filter(|r| r.saw_score.is_some_and(|s| s >= setting.passing_grade))
        .collect();
    eligible.sort_by(|a, b| {
        let sa = a.saw_score.unwrap_or_default();
        let sb = b.saw_score.unwrap_or_default();
        sb.total_cmp(&sa).then(a.id.cmp(&b.id))
    });
    eligible.truncate(usize::try_from(setting.kuota).unwrap_or(usize::MAX));
    eligible
}
