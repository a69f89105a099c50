// Rust guideline compliant 2026-10-14

//! Model training pipeline -- builds a [`KnnModel`] from the recipient
//! population and the current passing grade, evaluates it, and persists it
//! through a [`ModelStore`].
//!
//! Entry points: [`ModelTrainer::fit`], [`ModelTrainer::train`].
//! Configuration via [`TrainerConfig::builder`].

use std::fmt;
use std::sync::{Mutex, PoisonError};

use classifier::{KnnError, KnnModel, ModelStore, ModelStoreError};
use domain::{EligibilityLabel, Recipient};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, rngs::StdRng};
use scoring::vectorize;
use serde::Serialize;

// ---------------------------------------------------------------------------
// TrainerError
// ---------------------------------------------------------------------------

/// Errors that can occur while training.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    /// The supplied configuration is invalid.
    #[error("invalid trainer configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// No recipient carries a stored score.
    #[error("no training data")]
    NoTrainingData,
    /// The model rejected the training set.
    #[error("model fit failed: {source}")]
    Model {
        /// The underlying model error.
        #[from]
        source: KnnError,
    },
    /// Persisting the artifact failed.
    #[error("model persistence failed: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: ModelStoreError,
    },
}

// ---------------------------------------------------------------------------
// TrainerConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`ModelTrainer`].
///
/// Construct via [`TrainerConfig::builder`].
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Upper bound on the neighbor count; the fitted `k` is
    /// `min(max_neighbors, training samples)`.
    pub max_neighbors: usize,
    /// Share of the balanced set held out for evaluation, in `(0, 1)`.
    pub test_fraction: f64,
    /// Optional RNG seed for reproducible balancing and splits. `None` seeds
    /// from the OS.
    pub seed: Option<u64>,
}

/// Builder for [`TrainerConfig`].
///
/// Obtain via [`TrainerConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct TrainerConfigBuilder {
    max_neighbors: usize,
    test_fraction: f64,
    seed: Option<u64>,
}

impl TrainerConfig {
    /// Create a builder.
    ///
    /// Default values: `max_neighbors = 5`, `test_fraction = 0.2`, `seed = None`.
    #[must_use]
    pub fn builder() -> TrainerConfigBuilder {
        TrainerConfigBuilder { max_neighbors: 5, test_fraction: 0.2, seed: None }
    }
}

impl TrainerConfigBuilder {
    /// Override the neighbor cap.
    #[must_use]
    pub fn max_neighbors(mut self, max_neighbors: usize) -> Self {
        self.max_neighbors = max_neighbors;
        self
    }

    /// Override the held-out share.
    #[must_use]
    pub fn test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Fix the RNG seed for deterministic training (useful in tests).
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::InvalidConfig`] when `max_neighbors` is zero or
    /// `test_fraction` is outside `(0, 1)`.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<TrainerConfig, TrainerError> {
        if self.max_neighbors == 0 {
            return Err(TrainerError::InvalidConfig {
                reason: "max_neighbors must be >= 1".to_owned(),
            });
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TrainerError::InvalidConfig {
                reason: format!("test_fraction {} outside (0, 1)", self.test_fraction),
            });
        }
        Ok(TrainerConfig {
            max_neighbors: self.max_neighbors,
            test_fraction: self.test_fraction,
            seed: self.seed,
        })
    }
}

// ---------------------------------------------------------------------------
// ClassificationReport
// ---------------------------------------------------------------------------

/// Per-class evaluation metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: EligibilityLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of test samples whose true label is this class.
    pub support: usize,
}

/// Held-out evaluation of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    /// Metrics for class 0 (not eligible) then class 1 (eligible).
    pub classes: [ClassMetrics; 2],
}

impl ClassificationReport {
    /// Compare `predicted` against `actual`. Undefined ratios are reported as 0.
    #[must_use]
    pub fn evaluate(actual: &[u8], predicted: &[u8]) -> Self {
        let correct = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
        let metrics = |class: u8| {
            let tp = actual.iter().zip(predicted).filter(|&(&a, &p)| a == class && p == class).count();
            let predicted_n = predicted.iter().filter(|&&p| p == class).count();
            let support = actual.iter().filter(|&&a| a == class).count();
            let precision = ratio(tp, predicted_n);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label: EligibilityLabel::from_prediction(class == 1),
                precision,
                recall,
                f1,
                support,
            }
        };
        Self { accuracy: ratio(correct, actual.len()), classes: [metrics(0), metrics(1)] }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label.as_str(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        write!(f, "{:>14} {:>9.2}", "accuracy", self.accuracy)
    }
}

#[expect(clippy::cast_precision_loss, reason = "sample counts stay far below 2^52")]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

// ---------------------------------------------------------------------------
// ModelTrainer
// ---------------------------------------------------------------------------

/// Result of a successful fit.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: KnnModel,
    /// `None` when the data held a single class and evaluation was skipped.
    pub report: Option<ClassificationReport>,
    /// Recipients used as training samples (before balancing).
    pub samples: usize,
    /// Recipients left out because they carry no stored score.
    pub excluded: usize,
}

/// Builds KNN models from the recipient population.
///
/// Labels come from each recipient's stored normalized score: 1 when the score
/// reaches the passing grade, 0 otherwise.
#[derive(Debug)]
pub struct ModelTrainer {
    config: TrainerConfig,
    rng: Mutex<StdRng>,
}

impl ModelTrainer {
    /// Create a trainer; the RNG is seeded once here.
    #[must_use]
    pub fn new(config: TrainerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng: Mutex::new(rng) }
    }

    /// Fit a model without persisting it.
    ///
    /// A population with a single label class trains on every sample and skips
    /// evaluation. Otherwise the minority class is upsampled with replacement,
    /// the balanced set is split (stratified when possible), and the model is
    /// evaluated on the held-out part.
    ///
    /// # Errors
    ///
    /// Returns [`TrainerError::NoTrainingData`] when no recipient carries a
    /// stored score, or [`TrainerError::Model`] when fitting fails.
    pub fn fit(
        &self,
        recipients: &[Recipient],
        passing_grade: f64,
    ) -> Result<TrainingOutcome, TrainerError> {
        let mut features = Vec::with_capacity(recipients.len());
        let mut labels = Vec::with_capacity(recipients.len());
        for r in recipients {
            if let Some(score) = r.saw_score {
                features.push(vectorize(&r.criteria).to_vec());
                labels.push(u8::from(score >= passing_grade));
            }
        }
        let samples = labels.len();
        let excluded = recipients.len() - samples;
        if samples == 0 {
            tracing::error!("trainer.fit: no scored recipients total={}", recipients.len());
            return Err(TrainerError::NoTrainingData);
        }
        if excluded > 0 {
            tracing::info!("trainer.fit: excluded unscored recipients count={excluded}");
        }

        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == samples {
            let k = self.config.max_neighbors.min(samples);
            tracing::warn!(
                "trainer.fit.degenerate: single label class, training on all samples={samples} k={k}"
            );
            let model = KnnModel::fit(features, labels, k)?;
            return Ok(TrainingOutcome { model, report: None, samples, excluded });
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let (features, labels) = upsample_minority(features, labels, &mut *rng);
        let n_test = test_count(labels.len(), self.config.test_fraction);
        let (train_idx, test_idx) = stratified_split(&labels, n_test, &mut *rng)
            .unwrap_or_else(|| {
                tracing::debug!("trainer.fit: stratification impossible, using random split");
                random_split(labels.len(), n_test, &mut *rng)
            });
        drop(rng);

        let k = self.config.max_neighbors.min(train_idx.len());
        let model = KnnModel::fit(
            train_idx.iter().map(|&i| features[i].clone()).collect(),
            train_idx.iter().map(|&i| labels[i]).collect(),
            k,
        )?;

        let actual: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();
        let predicted = test_idx
            .iter()
            .map(|&i| model.predict(&features[i]))
            .collect::<Result<Vec<u8>, KnnError>>()?;
        let report = ClassificationReport::evaluate(&actual, &predicted);
        tracing::info!(
            "trainer.fit: samples={samples} balanced={} train={} test={} k={k} accuracy={:.4}",
            labels.len(),
            train_idx.len(),
            test_idx.len(),
            report.accuracy
        );
        Ok(TrainingOutcome { model, report: Some(report), samples, excluded })
    }

    /// Fit a model and persist it through `store`, overwriting any previous
    /// artifact.
    ///
    /// # Errors
    ///
    /// Everything [`fit`](Self::fit) returns, plus [`TrainerError::Store`] when
    /// the artifact cannot be written.
    pub fn train(
        &self,
        recipients: &[Recipient],
        passing_grade: f64,
        store: &impl ModelStore,
    ) -> Result<TrainingOutcome, TrainerError> {
        let outcome = self.fit(recipients, passing_grade)?;
        store.save(&outcome.model).inspect_err(|e| {
            tracing::error!("trainer.train: persisting model failed error={e}");
        })?;
        tracing::info!("trainer.train: model saved k={}", outcome.model.k());
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Balancing and splitting
// ---------------------------------------------------------------------------

/// Append random copies (with replacement) of minority-class samples until
/// both classes are the same size. Both classes must be present.
fn upsample_minority(
    mut features: Vec<Vec<f64>>,
    mut labels: Vec<u8>,
    rng: &mut impl Rng,
) -> (Vec<Vec<f64>>, Vec<u8>) {
    let positives: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == 1).collect();
    let negatives: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == 0).collect();
    let (minority, missing) = if positives.len() < negatives.len() {
        let missing = negatives.len() - positives.len();
        (positives, missing)
    } else {
        let missing = positives.len() - negatives.len();
        (negatives, missing)
    };
    for _ in 0..missing {
        let pick = minority[rng.random_range(0..minority.len())];
        features.push(features[pick].clone());
        labels.push(labels[pick]);
    }
    (features, labels)
}

/// `ceil(n * fraction)`, kept within `[1, n - 1]`. Requires `n >= 2`.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "sample counts are small and the product lies in [0, n]"
)]
fn test_count(n: usize, fraction: f64) -> usize {
    let raw = (n as f64 * fraction).ceil() as usize;
    raw.clamp(1, n - 1)
}

/// Split preserving class proportions. `None` when a class would end up
/// empty on either side.
fn stratified_split(
    labels: &[u8],
    n_test: usize,
    rng: &mut impl Rng,
) -> Option<(Vec<usize>, Vec<usize>)> {
    let n = labels.len();
    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, &l) in labels.iter().enumerate() {
        by_class[usize::from(l)].push(i);
    }

    let mut quota = by_class.clone().map(|members| n_test * members.len() / n);
    let mut remaining = n_test - quota.iter().sum::<usize>();
    for (class, members) in by_class.iter().enumerate() {
        if remaining > 0 && quota[class] + 1 < members.len() {
            quota[class] += 1;
            remaining -= 1;
        }
    }
    if remaining > 0
        || by_class.iter().zip(&quota).any(|(members, &t)| t == 0 || t >= members.len())
    {
        return None;
    }

    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (mut members, t) in by_class.into_iter().zip(quota) {
        members.shuffle(rng);
        let rest = members.split_off(t);
        test.extend(members);
        train.extend(rest);
    }
    train.sort_unstable();
    test.sort_unstable();
    Some((train, test))
}

/// Plain shuffled split.
fn random_split(n: usize, n_test: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(rng);
    let mut train = idx.split_off(n_test);
    let mut test = idx;
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Criteria, Location, RecipientId};

    fn recipient(id: i64, criteria: Criteria, saw_score: Option<f64>) -> Recipient {
        Recipient {
            id: RecipientId(id),
            name: format!("R{id}"),
            national_id: None,
            location: Location::default(),
            occupation: String::new(),
            criteria,
            saw_score,
            label: None,
        }
    }

    fn scored(id: i64, criteria: Criteria) -> Recipient {
        let score = scoring::compute_score(&criteria).normalized;
        recipient(id, criteria, Some(score))
    }

    fn strong() -> Criteria {
        Criteria {
            dtks: true,
            extreme_poverty: true,
            unemployed: true,
            ..Criteria::default()
        }
    }

    fn weak() -> Criteria {
        Criteria { pkh: true, bst: true, ..Criteria::default() }
    }

    fn trainer(seed: u64) -> ModelTrainer {
        ModelTrainer::new(TrainerConfig::builder().seed(seed).build().unwrap())
    }

    // ------------------------------------------------------------------
    // MockStore helper
    // ------------------------------------------------------------------

    struct MockStore {
        saved: Mutex<Option<KnnModel>>,
        fail: bool,
    }

    impl MockStore {
        fn new(fail: bool) -> Self {
            Self { saved: Mutex::new(None), fail }
        }
    }

    impl ModelStore for MockStore {
        fn load(&self) -> Result<Option<KnnModel>, ModelStoreError> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(&self, model: &KnnModel) -> Result<(), ModelStoreError> {
            if self.fail {
                return Err(ModelStoreError::Io { reason: "read-only".to_owned() });
            }
            *self.saved.lock().unwrap() = Some(model.clone());
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Config
    // ------------------------------------------------------------------

    #[test]
    fn config_defaults() {
        let config = TrainerConfig::builder().build().unwrap();
        assert_eq!(config.max_neighbors, 5);
        assert!((config.test_fraction - 0.2).abs() < f64::EPSILON);
        assert!(config.seed.is_none());
    }

    #[test]
    fn config_rejects_invalid_values() {
        assert!(matches!(
            TrainerConfig::builder().max_neighbors(0).build(),
            Err(TrainerError::InvalidConfig { .. })
        ));
        assert!(matches!(
            TrainerConfig::builder().test_fraction(1.0).build(),
            Err(TrainerError::InvalidConfig { .. })
        ));
        assert!(matches!(
            TrainerConfig::builder().test_fraction(f64::NAN).build(),
            Err(TrainerError::InvalidConfig { .. })
        ));
    }

    // ------------------------------------------------------------------
    // fit: data requirements
    // ------------------------------------------------------------------

    #[test]
    fn empty_population_fails() {
        assert!(matches!(trainer(1).fit(&[], 0.5), Err(TrainerError::NoTrainingData)));
    }

    #[test]
    fn empty_population_persists_nothing() {
        let store = MockStore::new(false);
        assert!(matches!(
            trainer(1).train(&[], 0.5, &store),
            Err(TrainerError::NoTrainingData)
        ));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn unscored_only_population_fails() {
        let rs = vec![recipient(1, strong(), None), recipient(2, weak(), None)];
        assert!(matches!(trainer(1).fit(&rs, 0.5), Err(TrainerError::NoTrainingData)));
    }

    #[test]
    fn unscored_recipients_are_excluded() {
        let rs = vec![
            scored(1, strong()),
            scored(2, weak()),
            scored(3, strong()),
            scored(4, weak()),
            recipient(5, strong(), None),
        ];
        let outcome = trainer(3).fit(&rs, 0.5).unwrap();
        assert_eq!(outcome.samples, 4);
        assert_eq!(outcome.excluded, 1);
    }

    #[test]
    fn label_threshold_is_inclusive() {
        // 0.6875 >= 0.6875 -> label 1, the only class present.
        let criteria = Criteria {
            dtks: true,
            extreme_poverty: true,
            unemployed: true,
            pkh: true,
            ..Criteria::default()
        };
        let outcome = trainer(1).fit(&[scored(1, criteria)], 0.6875).unwrap();
        assert_eq!(outcome.model.predict(&vectorize(&Criteria::default())).unwrap(), 1);
    }

    // ------------------------------------------------------------------
    // fit: degenerate single class
    // ------------------------------------------------------------------

    #[test]
    fn single_class_trains_on_all_samples() {
        let rs: Vec<Recipient> = (1..=3).map(|i| scored(i, weak())).collect();
        let outcome = trainer(1).fit(&rs, 0.5).unwrap();
        assert!(outcome.report.is_none());
        assert_eq!(outcome.model.samples(), 3);
        assert_eq!(outcome.model.k(), 3);
    }

    #[test]
    fn single_class_k_capped_by_max_neighbors() {
        let rs: Vec<Recipient> = (1..=8).map(|i| scored(i, strong())).collect();
        let outcome = trainer(1).fit(&rs, 0.5).unwrap();
        assert_eq!(outcome.model.k(), 5);
    }

    // ------------------------------------------------------------------
    // fit: balanced path
    // ------------------------------------------------------------------

    #[test]
    fn imbalanced_population_is_balanced_and_evaluated() {
        let mut rs: Vec<Recipient> = (1..=8).map(|i| scored(i, weak())).collect();
        rs.push(scored(9, strong()));
        rs.push(scored(10, strong()));
        let outcome = trainer(42).fit(&rs, 0.5).unwrap();

        // 8 + 8 after upsampling, ceil(0.2 * 16) = 4 held out.
        let report = outcome.report.unwrap();
        assert_eq!(report.classes[0].support + report.classes[1].support, 4);
        assert_eq!(report.classes[0].support, 2);
        assert_eq!(outcome.model.samples(), 12);
        assert_eq!(outcome.model.k(), 5);
        // Perfectly separable data.
        assert!((report.accuracy - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn two_samples_fall_back_to_random_split() {
        let rs = vec![scored(1, strong()), scored(2, weak())];
        let outcome = trainer(7).fit(&rs, 0.5).unwrap();
        assert_eq!(outcome.model.samples(), 1);
        assert_eq!(outcome.model.k(), 1);
        let report = outcome.report.unwrap();
        assert_eq!(report.classes[0].support + report.classes[1].support, 1);
    }

    #[test]
    fn seeded_training_is_reproducible() {
        let mut rs: Vec<Recipient> = (1..=6).map(|i| scored(i, weak())).collect();
        rs.push(scored(7, strong()));
        rs.push(scored(8, Criteria { dtks: true, ..Criteria::default() }));
        let a = trainer(42).fit(&rs, 0.5).unwrap();
        let b = trainer(42).fit(&rs, 0.5).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.report, b.report);
    }

    // ------------------------------------------------------------------
    // train: persistence
    // ------------------------------------------------------------------

    #[test]
    fn train_persists_model() {
        let store = MockStore::new(false);
        let rs = vec![scored(1, strong()), scored(2, weak()), scored(3, strong())];
        let outcome = trainer(1).train(&rs, 0.5, &store).unwrap();
        assert_eq!(store.load().unwrap(), Some(outcome.model));
    }

    #[test]
    fn train_propagates_store_failure() {
        let store = MockStore::new(true);
        let rs = vec![scored(1, strong())];
        assert!(matches!(
            trainer(1).train(&rs, 0.5, &store),
            Err(TrainerError::Store { .. })
        ));
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    #[test]
    fn upsample_equalizes_classes() {
        let mut rng = StdRng::seed_from_u64(5);
        let features = vec![vec![0.0]; 5];
        let (f, l) = upsample_minority(features, vec![0, 0, 0, 0, 1], &mut rng);
        assert_eq!(f.len(), 8);
        assert_eq!(l.iter().filter(|&&x| x == 1).count(), 4);
    }

    #[test]
    fn upsample_equalizes_classes_with_negative_minority() {
        let mut rng = StdRng::seed_from_u64(5);
        let features = vec![vec![0.0]; 4];
        let (f, l) = upsample_minority(features, vec![1, 1, 1, 0], &mut rng);
        assert_eq!(f.len(), 6);
        assert_eq!(l.iter().filter(|&&x| x == 0).count(), 3);
    }

    #[test]
    fn test_count_rounds_up_and_clamps() {
        assert_eq!(test_count(10, 0.2), 2);
        assert_eq!(test_count(11, 0.2), 3);
        assert_eq!(test_count(2, 0.2), 1);
        assert_eq!(test_count(2, 0.9), 1);
    }

    #[test]
    fn stratified_split_keeps_proportions() {
        let mut rng = StdRng::seed_from_u64(9);
        let labels = [0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let (train, test) = stratified_split(&labels, 2, &mut rng).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 1);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 0).count(), 1);
    }

    #[test]
    fn stratified_split_impossible_with_singletons() {
        let mut rng = StdRng::seed_from_u64(9);
        assert!(stratified_split(&[0, 1], 1, &mut rng).is_none());
    }

    #[test]
    fn report_metrics() {
        let report = ClassificationReport::evaluate(&[1, 1, 0, 0], &[1, 0, 0, 0]);
        assert!((report.accuracy - 0.75).abs() < 1e-9);
        let eligible = &report.classes[1];
        assert!((eligible.precision - 1.0).abs() < 1e-9);
        assert!((eligible.recall - 0.5).abs() < 1e-9);
        assert_eq!(eligible.support, 2);
        let not = &report.classes[0];
        assert!((not.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!(report.to_string().contains("accuracy"));
    }

    #[test]
    fn report_zero_division_is_zero() {
        let report = ClassificationReport::evaluate(&[0, 0], &[0, 0]);
        assert!((report.classes[1].precision).abs() < f64::EPSILON);
        assert!((report.classes[1].f1).abs() < f64::EPSILON);
        assert_eq!(report.classes[1].support, 0);
    }

    #[test]
    fn report_serializes_with_label_names() {
        let report = ClassificationReport::evaluate(&[1, 0], &[1, 0]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["classes"][0]["label"], "Not Eligible");
        assert_eq!(json["classes"][1]["label"], "Eligible");
        assert_eq!(json["accuracy"], 1.0);
    }
}
