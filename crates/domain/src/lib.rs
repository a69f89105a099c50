// Rust guideline compliant 2026-10-12

//! Shared domain types for the eligibility engine.
//!
//! Defines the `Recipient` record, the closed criteria schema ([`Criterion`],
//! [`FEATURE_ORDER`]), the `Setting` singleton, and the hexagonal port traits:
//! `RecipientRepository`, `SettingsRepository`, and `RegionLookup`.
//! All engine crates depend on this crate; no engine crate is imported here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Criteria schema
// ---------------------------------------------------------------------------

/// Whether a criterion raises or lowers the SAW score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionKind {
    /// Adds 1 to the raw score when set.
    Additive,
    /// Subtracts 1 from the raw score when set (existing aid enrollment).
    Reducing,
}

/// One of the ten weighted criteria used both for scoring and as a KNN feature.
///
/// DTKS registration is deliberately not a variant: it carries its own weight
/// in the SAW score and is not part of the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    /// Household lives in extreme poverty.
    ExtremePoverty,
    /// Recipient lost their source of livelihood.
    LossOfLivelihood,
    /// Recipient is unemployed.
    Unemployed,
    /// Recipient lives with a disability.
    Disability,
    /// Recipient suffers from a chronic illness.
    ChronicIllness,
    /// Single-person elderly household.
    SingleElderlyHousehold,
    /// Already enrolled in PKH (family hope program).
    Pkh,
    /// Already holds a pre-employment card.
    PreEmploymentCard,
    /// Already receives BST (cash social assistance).
    Bst,
    /// Already receives some other social aid.
    OtherSocialAid,
}

/// Criteria that add to the score, in feature order.
pub const ADDITIVE_CRITERIA: [Criterion; 6] = [
    Criterion::ExtremePoverty,
    Criterion::LossOfLivelihood,
    Criterion::Unemployed,
    Criterion::Disability,
    Criterion::ChronicIllness,
    Criterion::SingleElderlyHousehold,
];

/// Criteria that reduce the score, in feature order.
pub const REDUCING_CRITERIA: [Criterion; 4] = [
    Criterion::Pkh,
    Criterion::PreEmploymentCard,
    Criterion::Bst,
    Criterion::OtherSocialAid,
];

/// Number of positions in a feature vector.
pub const FEATURE_COUNT: usize = ADDITIVE_CRITERIA.len() + REDUCING_CRITERIA.len();

/// Positional contract between training and inference: additive criteria
/// first, then reducing criteria.
///
/// Any reordering silently invalidates every persisted model. Artifacts record
/// these field names and are rejected on load when they differ.
pub const FEATURE_ORDER: [Criterion; FEATURE_COUNT] = [
    Criterion::ExtremePoverty,
    Criterion::LossOfLivelihood,
    Criterion::Unemployed,
    Criterion::Disability,
    Criterion::ChronicIllness,
    Criterion::SingleElderlyHousehold,
    Criterion::Pkh,
    Criterion::PreEmploymentCard,
    Criterion::Bst,
    Criterion::OtherSocialAid,
];

impl Criterion {
    /// Stable storage/column name of this criterion.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::ExtremePoverty => "extreme_poverty",
            Self::LossOfLivelihood => "loss_of_livelihood",
            Self::Unemployed => "unemployed",
            Self::Disability => "disability",
            Self::ChronicIllness => "chronic_illness",
            Self::SingleElderlyHousehold => "single_elderly_household",
            Self::Pkh => "pkh",
            Self::PreEmploymentCard => "pre_employment_card",
            Self::Bst => "bst",
            Self::OtherSocialAid => "other_social_aid",
        }
    }

    /// Human-readable label shown in factor lists.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ExtremePoverty => "Extreme Poverty",
            Self::LossOfLivelihood => "Loss Of Livelihood",
            Self::Unemployed => "Unemployed",
            Self::Disability => "Disability",
            Self::ChronicIllness => "Chronic Illness",
            Self::SingleElderlyHousehold => "Single Elderly Household",
            Self::Pkh => "PKH",
            Self::PreEmploymentCard => "Pre-Employment Card",
            Self::Bst => "BST",
            Self::OtherSocialAid => "Other Social Aid",
        }
    }

    /// Whether this criterion adds to or reduces the score.
    #[must_use]
    pub const fn kind(self) -> CriterionKind {
        match self {
            Self::Pkh | Self::PreEmploymentCard | Self::Bst | Self::OtherSocialAid => {
                CriterionKind::Reducing
            }
            _ => CriterionKind::Additive,
        }
    }
}

/// Field names of [`FEATURE_ORDER`], as recorded in trained artifacts.
#[must_use]
pub fn feature_order_names() -> Vec<String> {
    FEATURE_ORDER.iter().map(|c| c.field_name().to_owned()).collect()
}

/// Boolean eligibility flags of one recipient.
///
/// Missing fields deserialize as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    /// Registered in the DTKS poverty registry.
    pub dtks: bool,
    pub extreme_poverty: bool,
    pub loss_of_livelihood: bool,
    pub unemployed: bool,
    pub disability: bool,
    pub chronic_illness: bool,
    pub single_elderly_household: bool,
    pub pkh: bool,
    pub pre_employment_card: bool,
    pub bst: bool,
    pub other_social_aid: bool,
}

impl Criteria {
    /// Return the flag stored for `criterion`.
    #[must_use]
    pub const fn is_set(&self, criterion: Criterion) -> bool {
        match criterion {
            Criterion::ExtremePoverty => self.extreme_poverty,
            Criterion::LossOfLivelihood => self.loss_of_livelihood,
            Criterion::Unemployed => self.unemployed,
            Criterion::Disability => self.disability,
            Criterion::ChronicIllness => self.chronic_illness,
            Criterion::SingleElderlyHousehold => self.single_elderly_household,
            Criterion::Pkh => self.pkh,
            Criterion::PreEmploymentCard => self.pre_employment_card,
            Criterion::Bst => self.bst,
            Criterion::OtherSocialAid => self.other_social_aid,
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Storage identifier of a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Administrative location codes. Opaque; never used in scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub province: String,
    pub regency: String,
    pub district: String,
    pub village: String,
}

/// Classifier verdict stored on a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EligibilityLabel {
    #[serde(rename = "Eligible")]
    Eligible,
    #[serde(rename = "Not Eligible")]
    NotEligible,
    /// Scored but not classified (no model was available).
    #[serde(rename = "Unscored")]
    Unscored,
}

impl EligibilityLabel {
    /// Map a binary classifier output (`true` = class 1) to a label.
    #[must_use]
    pub const fn from_prediction(eligible: bool) -> Self {
        if eligible { Self::Eligible } else { Self::NotEligible }
    }

    /// Canonical string form, as stored and displayed.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "Eligible",
            Self::NotEligible => "Not Eligible",
            Self::Unscored => "Unscored",
        }
    }
}

impl fmt::Display for EligibilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored label string is not one of the known labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown eligibility label: {0:?}")]
pub struct LabelParseError(pub String);

impl FromStr for EligibilityLabel {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Eligible" => Ok(Self::Eligible),
            "Not Eligible" => Ok(Self::NotEligible),
            "Unscored" => Ok(Self::Unscored),
            other => Err(LabelParseError(other.to_owned())),
        }
    }
}

/// A persisted social-assistance recipient.
///
/// `saw_score` and `label` are written only by the prediction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: String,
    pub national_id: Option<String>,
    pub location: Location,
    /// Employment category (free text).
    pub occupation: String,
    pub criteria: Criteria,
    /// Normalized SAW score in `[0, 1]`; `None` until first computed.
    pub saw_score: Option<f64>,
    /// Classifier verdict; `None` until first computed.
    pub label: Option<EligibilityLabel>,
}

/// A recipient as submitted by the data-entry collaborator, before storage
/// assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecipient {
    pub name: String,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub criteria: Criteria,
}

impl NewRecipient {
    /// Attach a storage id; derived fields start empty.
    #[must_use]
    pub fn into_recipient(self, id: RecipientId) -> Recipient {
        Recipient {
            id,
            name: self.name,
            national_id: self.national_id,
            location: self.location,
            occupation: self.occupation,
            criteria: self.criteria,
            saw_score: None,
            label: None,
        }
    }
}

/// Derived fields written back for one recipient after scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreUpdate {
    pub id: RecipientId,
    pub saw_score: f64,
    pub label: EligibilityLabel,
}

/// Name lookup with optional location filters to disambiguate namesakes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientQuery {
    pub name: String,
    pub province: Option<String>,
    pub regency: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
}

impl RecipientQuery {
    /// Query by name only.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Restrict to a province code.
    #[must_use]
    pub fn province(mut self, code: impl Into<String>) -> Self {
        self.province = Some(code.into());
        self
    }

    /// Restrict to a regency code.
    #[must_use]
    pub fn regency(mut self, code: impl Into<String>) -> Self {
        self.regency = Some(code.into());
        self
    }

    /// Restrict to a district code.
    #[must_use]
    pub fn district(mut self, code: impl Into<String>) -> Self {
        self.district = Some(code.into());
        self
    }

    /// Restrict to a village code.
    #[must_use]
    pub fn village(mut self, code: impl Into<String>) -> Self {
        self.village = Some(code.into());
        self
    }

    /// Whether `recipient` satisfies this query.
    ///
    /// Names compare case-insensitively after trimming; location filters
    /// compare exactly. Adapters without a query language use this directly.
    #[must_use]
    pub fn matches(&self, recipient: &Recipient) -> bool {
        fn filter_ok(filter: Option<&String>, value: &str) -> bool {
            filter.is_none_or(|f| f == value)
        }
        recipient.name.trim().eq_ignore_ascii_case(self.name.trim())
            && filter_ok(self.province.as_ref(), &recipient.location.province)
            && filter_ok(self.regency.as_ref(), &recipient.location.regency)
            && filter_ok(self.district.as_ref(), &recipient.location.district)
            && filter_ok(self.village.as_ref(), &recipient.location.village)
    }
}

// ---------------------------------------------------------------------------
// Setting
// ---------------------------------------------------------------------------

/// Errors raised when a setting value is out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingError {
    /// Passing grade must lie in `[0, 1]` (normalized SAW scale).
    #[error("passing grade {value} outside [0, 1]")]
    PassingGradeOutOfRange {
        /// Rejected value.
        value: f64,
    },
    /// Quota must allow at least one recipient.
    #[error("kuota must be >= 1")]
    ZeroKuota,
}

/// Global eligibility setting: threshold plus quota.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    /// Minimum normalized SAW score for eligibility, in `[0, 1]`.
    pub passing_grade: f64,
    /// Maximum number of eligible recipients surfaced.
    pub kuota: u32,
}

impl Setting {
    /// Default passing grade on the normalized scale.
    pub const DEFAULT_PASSING_GRADE: f64 = 0.5;
    /// Default quota.
    pub const DEFAULT_KUOTA: u32 = 50;

    /// Build a validated setting.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError::PassingGradeOutOfRange`] when `passing_grade` is
    /// not a finite value in `[0, 1]`, or [`SettingError::ZeroKuota`] when
    /// `kuota` is zero.
    pub fn new(passing_grade: f64, kuota: u32) -> Result<Self, SettingError> {
        if !(0.0..=1.0).contains(&passing_grade) {
            return Err(SettingError::PassingGradeOutOfRange { value: passing_grade });
        }
        if kuota == 0 {
            return Err(SettingError::ZeroKuota);
        }
        Ok(Self { passing_grade, kuota })
    }
}

impl Default for Setting {
    fn default() -> Self {
        Self { passing_grade: Self::DEFAULT_PASSING_GRADE, kuota: Self::DEFAULT_KUOTA }
    }
}

// ---------------------------------------------------------------------------
// Region reference data
// ---------------------------------------------------------------------------

/// One entry of a region reference list (`{id, name}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Errors from the repository ports.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// Backend unreachable or the statement failed.
    #[error("repository unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
    /// A stored row could not be mapped back into a domain value.
    #[error("invalid stored row: {reason}")]
    InvalidRow {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the `RegionLookup` port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Remote service unreachable or returned an error status.
    #[error("region lookup unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
    /// Response body was not a list of `{id, name}`.
    #[error("malformed region response: {reason}")]
    Malformed {
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: recipient persistence.
///
/// Engine crates depend exclusively on this trait -- never on a concrete
/// adapter. Futures are `Send` so batch runs can move to a background task.
pub trait RecipientRepository: Send + Sync {
    /// Recipients matching `query`, ordered by ascending id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend fails.
    fn find_by_name(
        &self,
        query: &RecipientQuery,
    ) -> impl Future<Output = Result<Vec<Recipient>, RepositoryError>> + Send;

    /// Every recipient, ordered by ascending id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend fails.
    fn all(&self) -> impl Future<Output = Result<Vec<Recipient>, RepositoryError>> + Send;

    /// Recipients whose id is in `ids`, ordered by ascending id. Unknown ids
    /// are silently absent from the result.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend fails.
    fn by_ids(
        &self,
        ids: &[RecipientId],
    ) -> impl Future<Output = Result<Vec<Recipient>, RepositoryError>> + Send;

    /// Write score and label for every entry in one all-or-nothing operation.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the write fails; no partial update
    /// must remain visible.
    fn bulk_update(
        &self,
        updates: Vec<ScoreUpdate>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Hexagonal port: the global setting singleton.
pub trait SettingsRepository: Send + Sync {
    /// Read the setting, creating it with [`Setting::default`] when absent.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend fails.
    fn load_or_init(&self) -> impl Future<Output = Result<Setting, RepositoryError>> + Send;

    /// Overwrite the setting.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the backend fails.
    fn save(&self, setting: Setting) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Hexagonal port: region reference data keyed by endpoint
/// (e.g. `provinces.json`, `regencies/11.json`).
pub trait RegionLookup: Send + Sync {
    /// Fetch the full `{id, name}` list behind `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the source is unreachable or malformed.
    fn fetch(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<Vec<Region>, LookupError>> + Send;
}
