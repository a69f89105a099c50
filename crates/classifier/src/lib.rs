// Rust guideline compliant 2026-10-13

//! K-nearest-neighbors eligibility classifier.
//!
//! [`KnnModel`] is the persisted artifact: training points, binary labels, the
//! neighbor count, and the feature-order contract it was trained with.
//! [`EligibilityClassifier`] holds the active model as an immutable `Arc`
//! snapshot behind a read-mostly lock; retraining swaps in a new snapshot.
//! Persistence goes through the [`ModelStore`] port.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use domain::{EligibilityLabel, FEATURE_COUNT, feature_order_names};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// KnnError
// ---------------------------------------------------------------------------

/// Errors raised while fitting, validating, or querying a [`KnnModel`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KnnError {
    /// No training points were supplied.
    #[error("model has no training points")]
    Empty,
    /// `k` must lie in `[1, samples]`.
    #[error("invalid neighbor count {k} for {samples} samples")]
    InvalidK {
        /// Requested neighbor count.
        k: usize,
        /// Number of training points.
        samples: usize,
    },
    /// A vector does not have the expected number of features.
    #[error("expected {expected} features, got {found}")]
    DimensionMismatch {
        /// Feature count of the model.
        expected: usize,
        /// Feature count of the offending vector.
        found: usize,
    },
    /// Points and labels differ in length.
    #[error("{points} points but {labels} labels")]
    LengthMismatch {
        /// Number of points.
        points: usize,
        /// Number of labels.
        labels: usize,
    },
    /// Labels must be 0 or 1.
    #[error("label {label} is not binary")]
    InvalidLabel {
        /// Offending label.
        label: u8,
    },
    /// A feature value is NaN or infinite.
    #[error("non-finite feature value at position {position}")]
    NonFinite {
        /// Index of the offending value.
        position: usize,
    },
    /// The artifact was trained with a different feature order.
    #[error("feature order mismatch: expected {expected:?}, found {found:?}")]
    FeatureOrderMismatch {
        /// Current feature order.
        expected: Vec<String>,
        /// Feature order recorded in the artifact.
        found: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// KnnModel
// ---------------------------------------------------------------------------

/// Trained k-nearest-neighbors model over the criteria feature space.
///
/// Distances are Euclidean. Among equidistant points the earlier training
/// point wins; a tied vote resolves to label 0 (not eligible).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnModel {
    k: usize,
    feature_order: Vec<String>,
    points: Vec<Vec<f64>>,
    labels: Vec<u8>,
}

impl KnnModel {
    /// Neighbor count used when no other value is requested.
    pub const DEFAULT_NEIGHBORS: usize = 3;

    /// Fit a model on `points` with binary `labels`.
    ///
    /// Fitting a KNN model only stores the training set; the current feature
    /// order is recorded alongside it.
    ///
    /// # Errors
    ///
    /// Returns [`KnnError`] when the training set is empty, `k` is out of
    /// range, or any point or label is malformed.
    pub fn fit(points: Vec<Vec<f64>>, labels: Vec<u8>, k: usize) -> Result<Self, KnnError> {
        let model = Self { k, feature_order: feature_order_names(), points, labels };
        model.validate()?;
        Ok(model)
    }

    /// Check the internal consistency of a (possibly deserialized) model,
    /// including its feature-order contract.
    ///
    /// # Errors
    ///
    /// Returns the first [`KnnError`] found.
    pub fn validate(&self) -> Result<(), KnnError> {
        let expected = feature_order_names();
        if self.feature_order != expected {
            return Err(KnnError::FeatureOrderMismatch {
                expected,
                found: self.feature_order.clone(),
            });
        }
        if self.points.is_empty() {
            return Err(KnnError::Empty);
        }
        if self.points.len() != self.labels.len() {
            return Err(KnnError::LengthMismatch {
                points: self.points.len(),
                labels: self.labels.len(),
            });
        }
        if self.k == 0 || self.k > self.points.len() {
            return Err(KnnError::InvalidK { k: self.k, samples: self.points.len() });
        }
        for point in &self.points {
            check_vector(point)?;
        }
        if let Some(&label) = self.labels.iter().find(|&&l| l > 1) {
            return Err(KnnError::InvalidLabel { label });
        }
        Ok(())
    }

    /// Predict the binary label (1 = eligible) of `features`.
    ///
    /// # Errors
    ///
    /// Returns [`KnnError::DimensionMismatch`] or [`KnnError::NonFinite`] for
    /// a malformed query vector, and [`KnnError::LengthMismatch`] when an
    /// unvalidated model carries fewer labels than points.
    pub fn predict(&self, features: &[f64]) -> Result<u8, KnnError> {
        check_vector(features)?;
        if self.points.len() != self.labels.len() {
            return Err(KnnError::LengthMismatch {
                points: self.points.len(),
                labels: self.labels.len(),
            });
        }
        let mut distances: Vec<(f64, u8)> = self
            .points
            .iter()
            .zip(&self.labels)
            .map(|(p, &label)| (squared_distance(p, features), label))
            .collect();
        // Stable sort: equal distances keep training order.
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let eligible_votes =
            distances.iter().take(self.k).filter(|&&(_, label)| label == 1).count();
        Ok(u8::from(eligible_votes * 2 > self.k))
    }

    /// Neighbor count.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// Number of stored training points.
    #[must_use]
    pub const fn samples(&self) -> usize {
        self.points.len()
    }

    /// Feature order the model was trained with.
    #[must_use]
    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }
}

fn check_vector(v: &[f64]) -> Result<(), KnnError> {
    if v.len() != FEATURE_COUNT {
        return Err(KnnError::DimensionMismatch { expected: FEATURE_COUNT, found: v.len() });
    }
    if let Some(position) = v.iter().position(|x| !x.is_finite()) {
        return Err(KnnError::NonFinite { position });
    }
    Ok(())
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

// ---------------------------------------------------------------------------
// ClassifierOutcome
// ---------------------------------------------------------------------------

/// Result of one classification, with soft failures kept as values.
///
/// Displays (and serializes) as the label text, or as a status message when
/// no label could be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierOutcome {
    /// The model produced a label.
    Label(EligibilityLabel),
    /// No trained model is loaded.
    ModelUnavailable,
    /// The model rejected the input; carries the error description.
    Failed(String),
}

impl ClassifierOutcome {
    /// Message shown when no model is loaded.
    pub const MODEL_UNAVAILABLE: &'static str = "Model KNN belum dilatih";

    /// The produced label, if any.
    #[must_use]
    pub const fn label(&self) -> Option<EligibilityLabel> {
        match self {
            Self::Label(label) => Some(*label),
            Self::ModelUnavailable | Self::Failed(_) => None,
        }
    }
}

impl fmt::Display for ClassifierOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => f.write_str(label.as_str()),
            Self::ModelUnavailable => f.write_str(Self::MODEL_UNAVAILABLE),
            Self::Failed(reason) => write!(f, "Error prediksi KNN: {reason}"),
        }
    }
}

impl Serialize for ClassifierOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Classify `features` with an optional model snapshot.
///
/// Never fails: a missing model or a prediction error becomes a soft outcome.
#[must_use]
pub fn classify_with(model: Option<&KnnModel>, features: &[f64]) -> ClassifierOutcome {
    let Some(model) = model else {
        return ClassifierOutcome::ModelUnavailable;
    };
    match model.predict(features) {
        Ok(label) => ClassifierOutcome::Label(EligibilityLabel::from_prediction(label == 1)),
        Err(e) => {
            tracing::error!("classifier.predict: failed error={e}");
            ClassifierOutcome::Failed(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ModelStore port
// ---------------------------------------------------------------------------

/// Errors from a [`ModelStore`].
#[derive(Debug, thiserror::Error)]
pub enum ModelStoreError {
    /// Reading or writing the artifact failed.
    #[error("model store I/O failed: {reason}")]
    Io {
        /// Human-readable description.
        reason: String,
    },
    /// The artifact could not be decoded.
    #[error("model artifact is corrupt: {reason}")]
    Corrupt {
        /// Human-readable description.
        reason: String,
    },
    /// The artifact decoded but is not a usable model.
    #[error("model artifact is invalid: {source}")]
    Invalid {
        /// Validation failure.
        #[from]
        source: KnnError,
    },
}

/// Hexagonal port: persisted model artifact at a fixed location.
pub trait ModelStore: Send + Sync {
    /// Load the artifact. A missing artifact is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelStoreError`] when the artifact exists but cannot be read
    /// or decoded.
    fn load(&self) -> Result<Option<KnnModel>, ModelStoreError>;

    /// Overwrite the artifact with `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelStoreError::Io`] when the write fails.
    fn save(&self, model: &KnnModel) -> Result<(), ModelStoreError>;
}

// ---------------------------------------------------------------------------
// EligibilityClassifier
// ---------------------------------------------------------------------------

/// Process-wide holder of the active model snapshot.
///
/// Readers clone the `Arc` and release the lock immediately, so an in-flight
/// batch keeps classifying with the snapshot it started with.
#[derive(Debug, Default)]
pub struct EligibilityClassifier {
    model: RwLock<Option<Arc<KnnModel>>>,
}

impl EligibilityClassifier {
    /// A classifier with no model loaded.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A classifier holding `model`.
    #[must_use]
    pub fn with_model(model: KnnModel) -> Self {
        Self { model: RwLock::new(Some(Arc::new(model))) }
    }

    /// Load the startup model from `store`.
    ///
    /// Tolerant: a missing artifact logs a warning, a corrupt or mismatched
    /// artifact logs an error, and both leave the classifier empty.
    #[must_use]
    pub fn load_from(store: &impl ModelStore) -> Self {
        let classifier = Self::empty();
        match classifier.reload(store) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("classifier.load: no model artifact, classifier untrained"),
            Err(e) => tracing::error!("classifier.load: artifact rejected error={e}"),
        }
        classifier
    }

    /// Current snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<KnnModel>> {
        self.model.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether a model is loaded.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.model.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Atomically swap in `model`.
    pub fn replace(&self, model: KnnModel) {
        let model = Arc::new(model);
        tracing::info!("classifier.replace: k={} samples={}", model.k(), model.samples());
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Some(model);
    }

    /// Re-read the artifact from `store` and swap it in.
    ///
    /// Returns `Ok(false)` when no artifact exists; the current snapshot is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ModelStoreError`] when the artifact cannot be read or fails
    /// validation; the current snapshot is kept.
    pub fn reload(&self, store: &impl ModelStore) -> Result<bool, ModelStoreError> {
        let Some(model) = store.load()? else {
            return Ok(false);
        };
        model.validate()?;
        self.replace(model);
        Ok(true)
    }

    /// Classify `features` with the current snapshot.
    #[must_use]
    pub fn classify(&self, features: &[f64]) -> ClassifierOutcome {
        classify_with(self.snapshot().as_deref(), features)
    }
}
