//! Fail-closed credit scorer
//!
//! Artifacts move `UNLOADED → READY` on the first successful load and are
//! cached from then on (unless `reload_per_call` is set). A call that cannot
//! produce a prediction is `DEGRADED`: it returns the default score and the
//! reason, and never an error.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use creditai_config::ScoringConfig;
use creditai_core::BusinessRecord;

use crate::features::FeatureMapper;
use crate::model::{load_regressor, Regressor};
use crate::scaler::StandardScaler;
use crate::ScoringError;

/// Why a call fell back to the default score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
    ArtifactsMissing,
    ArtifactInvalid,
    FeatureMismatch,
    NonNumericFeature,
    PredictionFailed,
    NonFinitePrediction,
}

impl DegradeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradeReason::ArtifactsMissing => "artifacts_missing",
            DegradeReason::ArtifactInvalid => "artifact_invalid",
            DegradeReason::FeatureMismatch => "feature_mismatch",
            DegradeReason::NonNumericFeature => "non_numeric_feature",
            DegradeReason::PredictionFailed => "prediction_failed",
            DegradeReason::NonFinitePrediction => "non_finite_prediction",
        }
    }
}

impl From<&ScoringError> for DegradeReason {
    fn from(err: &ScoringError) -> Self {
        match err {
            ScoringError::ArtifactMissing(_) => DegradeReason::ArtifactsMissing,
            ScoringError::InvalidArtifact { .. } | ScoringError::UnsupportedFormat(_) => {
                DegradeReason::ArtifactInvalid
            },
            ScoringError::FeatureMismatch(_) => DegradeReason::FeatureMismatch,
            ScoringError::NonNumeric { .. } => DegradeReason::NonNumericFeature,
            ScoringError::Model(_) => DegradeReason::PredictionFailed,
            ScoringError::NonFinite(_) => DegradeReason::NonFinitePrediction,
        }
    }
}

/// Outcome of a scoring call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreResult {
    /// Model prediction, clamped to the configured bounds
    Computed { value: f64 },
    /// Default score substituted for a failed computation
    Default { value: f64, reason: DegradeReason },
}

impl ScoreResult {
    pub fn value(&self) -> f64 {
        match self {
            ScoreResult::Computed { value } | ScoreResult::Default { value, .. } => *value,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ScoreResult::Default { .. })
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            ScoreResult::Computed { .. } => "computed",
            ScoreResult::Default { .. } => "default",
        }
    }
}

/// Artifact lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Unloaded,
    Ready,
}

struct Artifacts {
    scaler: StandardScaler,
    model: Box<dyn Regressor>,
}

/// Credit scorer
pub struct Scorer {
    model_path: PathBuf,
    scaler_path: PathBuf,
    default_score: f64,
    min_score: f64,
    max_score: f64,
    reload_per_call: bool,
    mapper: FeatureMapper,
    artifacts: RwLock<Option<Arc<Artifacts>>>,
}

impl Scorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            model_path: PathBuf::from(&config.model_path),
            scaler_path: PathBuf::from(&config.scaler_path),
            default_score: config.default_score,
            min_score: config.min_score,
            max_score: config.max_score,
            reload_per_call: config.reload_per_call,
            mapper: FeatureMapper::new(),
            artifacts: RwLock::new(None),
        }
    }

    pub fn default_score(&self) -> f64 {
        self.default_score
    }

    pub fn state(&self) -> ArtifactState {
        if self.artifacts.read().is_some() {
            ArtifactState::Ready
        } else {
            ArtifactState::Unloaded
        }
    }

    /// Load artifacts eagerly; a failure leaves the scorer unloaded
    pub fn preload(&self) -> Result<(), ScoringError> {
        self.artifacts().map(|_| ())
    }

    /// Score a business record
    ///
    /// Never fails: any error while loading, mapping, scaling or predicting
    /// yields [`ScoreResult::Default`].
    pub fn score(&self, record: &BusinessRecord) -> ScoreResult {
        match self.try_score(record) {
            Ok(value) => ScoreResult::Computed { value },
            Err(e) => {
                let reason = DegradeReason::from(&e);
                tracing::warn!(
                    gst_in = record.gst_in().unwrap_or(""),
                    reason = reason.as_str(),
                    error = %e,
                    "Falling back to default credit score"
                );
                ScoreResult::Default {
                    value: self.default_score,
                    reason,
                }
            },
        }
    }

    fn try_score(&self, record: &BusinessRecord) -> Result<f64, ScoringError> {
        let artifacts = self.artifacts()?;

        let features = self.mapper.transform(record);
        let scaled = artifacts.scaler.transform(&features)?;
        let prediction = artifacts.model.predict(&scaled)?;

        if !prediction.is_finite() {
            return Err(ScoringError::NonFinite(prediction));
        }
        Ok(prediction.max(self.min_score).min(self.max_score))
    }

    fn artifacts(&self) -> Result<Arc<Artifacts>, ScoringError> {
        if !self.reload_per_call {
            if let Some(cached) = self.artifacts.read().as_ref() {
                return Ok(cached.clone());
            }
        }

        let loaded = Arc::new(self.load()?);

        if self.reload_per_call {
            return Ok(loaded);
        }

        let mut slot = self.artifacts.write();
        // another caller may have finished loading first
        Ok(slot.get_or_insert_with(|| loaded).clone())
    }

    fn load(&self) -> Result<Artifacts, ScoringError> {
        let scaler = StandardScaler::from_file(&self.scaler_path)?;
        let model = load_regressor(&self.model_path)?;

        if let Some(n) = model.n_features() {
            if n != scaler.n_features() {
                return Err(ScoringError::invalid(
                    self.model_path.display().to_string(),
                    format!(
                        "model expects {} features but scaler was fitted on {}",
                        n,
                        scaler.n_features()
                    ),
                ));
            }
        }

        tracing::info!(
            model = %self.model_path.display(),
            scaler = %self.scaler_path.display(),
            kind = model.kind(),
            features = scaler.n_features(),
            "Loaded scoring artifacts"
        );

        Ok(Artifacts { scaler, model })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const FEATURES: [&str; 10] = [
        "Annual Revenue",
        "Loan Amount",
        "GST Compliance (%)",
        "Past Defaults",
        "Bank Transactions",
        "Market Trend",
        "financial_health",
        "repayment_history",
        "credit_utilization",
        "industry_risk",
    ];

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path.display().to_string()
    }

    fn scaler_json() -> String {
        serde_json::json!({
            "feature_names": FEATURES,
            "mean": [1000000.0, 250000.0, 80.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 0.5],
            "scale": [500000.0, 100000.0, 10.0, 1.0, 1.0, 1.0, 0.2, 0.2, 0.2, 0.2],
            "with_mean": true,
            "with_std": true
        })
        .to_string()
    }

    fn model_json(init: f64, leaf: f64) -> String {
        serde_json::json!({
            "init": init,
            "learning_rate": 1.0,
            "n_features": 10,
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.0, -2.0, -2.0],
                "value": [0.0, -50.0, leaf]
            }]
        })
        .to_string()
    }

    fn config(dir: &TempDir, model: &str) -> ScoringConfig {
        ScoringConfig {
            model_path: write(dir, "model.json", model),
            scaler_path: write(dir, "scaler.json", &scaler_json()),
            ..ScoringConfig::default()
        }
    }

    fn record() -> BusinessRecord {
        BusinessRecord::new()
            .with("GST_IN", "29ABCDE1234F1Z5")
            .with("Annual_Revenue", 2_000_000.0)
            .with("Loan_Amount", 200_000.0)
            .with("GST_Compliance", 95.0)
            .with("Past_Defaults", 0)
            .with("Bank_Transactions", "High Volume")
            .with("Market_Trend", "Stable")
            .with("Financial_Health", 0.8)
            .with("Repayment_History", 0.9)
            .with("Credit_Utilization", 0.2)
            .with("Industry_Risk", 0.3)
    }

    #[test]
    fn test_computed_score_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let scorer = Scorer::new(&config(&dir, &model_json(650.0, 80.0)));
        assert_eq!(scorer.state(), ArtifactState::Unloaded);

        let first = scorer.score(&record());
        let second = scorer.score(&record());
        // revenue above the mean → right leaf
        assert_eq!(first, ScoreResult::Computed { value: 730.0 });
        assert_eq!(first, second);
        assert_eq!(scorer.state(), ArtifactState::Ready);
    }

    #[test]
    fn test_prediction_is_clamped() {
        let dir = TempDir::new().unwrap();
        let scorer = Scorer::new(&config(&dir, &model_json(650.0, 10_000.0)));
        assert_eq!(scorer.score(&record()).value(), 900.0);

        let scorer = Scorer::new(&config(&dir, &model_json(-5_000.0, 0.0)));
        let result = scorer.score(&record());
        assert!(!result.is_default());
        assert_eq!(result.value(), 300.0);
    }

    #[test]
    fn test_missing_fields_give_default() {
        let dir = TempDir::new().unwrap();
        let scorer = Scorer::new(&config(&dir, &model_json(650.0, 80.0)));

        let partial = BusinessRecord::new()
            .with("GST_IN", "X")
            .with("Annual_Revenue", 10.0);
        assert_eq!(
            scorer.score(&partial),
            ScoreResult::Default {
                value: 650.0,
                reason: DegradeReason::FeatureMismatch
            }
        );
    }

    #[test]
    fn test_unrecognised_label_gives_default() {
        let dir = TempDir::new().unwrap();
        let scorer = Scorer::new(&config(&dir, &model_json(650.0, 80.0)));

        let mut record = record();
        record.insert("Market_Trend", "Sideways");
        let result = scorer.score(&record);
        assert!(result.is_default());
        assert_eq!(
            result,
            ScoreResult::Default {
                value: 650.0,
                reason: DegradeReason::NonNumericFeature
            }
        );
    }

    #[test]
    fn test_non_finite_feature_gives_default() {
        let dir = TempDir::new().unwrap();
        let scorer = Scorer::new(&config(&dir, &model_json(650.0, 80.0)));

        for text in ["NaN", "inf", "-infinity"] {
            let mut record = record();
            record.insert("Annual_Revenue", text);
            assert_eq!(
                scorer.score(&record),
                ScoreResult::Default {
                    value: 650.0,
                    reason: DegradeReason::NonNumericFeature
                },
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_missing_artifacts_give_default_and_are_retried() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.json").display().to_string();
        let scaler_path = write(&dir, "scaler.json", &scaler_json());
        let scorer = Scorer::new(&ScoringConfig {
            model_path: model_path.clone(),
            scaler_path,
            ..ScoringConfig::default()
        });

        assert_eq!(
            scorer.score(&record()),
            ScoreResult::Default {
                value: 650.0,
                reason: DegradeReason::ArtifactsMissing
            }
        );
        assert_eq!(scorer.state(), ArtifactState::Unloaded);

        // failed loads are not cached
        write(&dir, "model.json", &model_json(650.0, 80.0));
        assert_eq!(scorer.score(&record()).value(), 730.0);
    }

    #[test]
    fn test_mismatched_artifacts_are_invalid() {
        let dir = TempDir::new().unwrap();
        let model = model_json(650.0, 80.0).replace("\"n_features\":10", "\"n_features\":3");
        let scorer = Scorer::new(&config(&dir, &model));
        assert!(matches!(
            scorer.preload(),
            Err(ScoringError::InvalidArtifact { .. })
        ));
        assert_eq!(
            scorer.score(&record()),
            ScoreResult::Default {
                value: 650.0,
                reason: DegradeReason::ArtifactInvalid
            }
        );
    }

    #[test]
    fn test_reload_per_call_does_not_cache() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir, &model_json(650.0, 80.0));
        cfg.reload_per_call = true;
        let scorer = Scorer::new(&cfg);

        assert_eq!(scorer.score(&record()).value(), 730.0);
        assert_eq!(scorer.state(), ArtifactState::Unloaded);

        write(&dir, "model.json", &model_json(600.0, 80.0));
        assert_eq!(scorer.score(&record()).value(), 680.0);
    }

    #[test]
    fn test_shipped_demo_artifacts_load() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models");
        let scorer = Scorer::new(&ScoringConfig {
            model_path: root.join("gradient_boosting_model.json").display().to_string(),
            scaler_path: root.join("scaler.json").display().to_string(),
            ..ScoringConfig::default()
        });
        assert!(scorer.preload().is_ok());

        let result = scorer.score(&record());
        assert!(!result.is_default());
        assert!((300.0..=900.0).contains(&result.value()));
    }
}
