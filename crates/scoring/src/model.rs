//! Regression models
//!
//! The artifact format is chosen by file extension:
//! - `.json`: gradient-boosted regression tree ensemble
//! - `.onnx`: ONNX graph (requires the `onnx` feature)

use std::path::Path;

#[cfg(feature = "onnx")]
use ndarray::Array2;
#[cfg(feature = "onnx")]
use ort::{session::builder::GraphOptimizationLevel, session::Session, value::Tensor};
#[cfg(feature = "onnx")]
use parking_lot::Mutex;
use serde::Deserialize;

use crate::ScoringError;

/// A fitted single-output regressor
pub trait Regressor: Send + Sync {
    /// Predict from one scaled feature row
    fn predict(&self, features: &[f64]) -> Result<f64, ScoringError>;

    /// Input width, when the artifact records it
    fn n_features(&self) -> Option<usize>;

    /// Short format name for logs and health output
    fn kind(&self) -> &'static str;
}

/// Load a regressor, picking the format from the file extension
pub fn load_regressor(path: impl AsRef<Path>) -> Result<Box<dyn Regressor>, ScoringError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ScoringError::ArtifactMissing(path.display().to_string()));
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Box::new(TreeEnsemble::from_file(path)?)),
        #[cfg(feature = "onnx")]
        Some("onnx") => Ok(Box::new(OnnxRegressor::from_file(path)?)),
        #[cfg(not(feature = "onnx"))]
        Some("onnx") => Err(ScoringError::UnsupportedFormat(
            "onnx models require the `onnx` feature".to_string(),
        )),
        other => Err(ScoringError::UnsupportedFormat(format!(
            "unknown model extension {:?}",
            other.unwrap_or("")
        ))),
    }
}

/// One regression tree in array form
///
/// Node `i` is a leaf when `children_left[i] == -1`; otherwise the walk goes
/// left when `x[feature[i]] <= threshold[i]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegressionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<f64>,
}

impl RegressionTree {
    fn validate(&self, n_features: Option<usize>) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree arrays differ in length".to_string());
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if left == -1 {
                continue;
            }
            // children must point forward so the walk terminates
            for child in [left, right] {
                if child <= i as i64 || child >= n as i64 {
                    return Err(format!("node {} has invalid child {}", i, child));
                }
            }
            let feature = self.feature[i];
            if feature < 0 || n_features.map_or(false, |nf| feature as usize >= nf) {
                return Err(format!("node {} splits on invalid feature {}", i, feature));
            }
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Result<f64, ScoringError> {
        let mut node = 0usize;
        loop {
            let left = self.children_left[node];
            if left == -1 {
                return Ok(self.value[node]);
            }
            let x = features
                .get(self.feature[node] as usize)
                .copied()
                .ok_or_else(|| {
                    ScoringError::FeatureMismatch(format!(
                        "model splits on feature {} but row has {}",
                        self.feature[node],
                        features.len()
                    ))
                })?;
            node = if x <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }
}

/// Gradient-boosted tree ensemble
///
/// `prediction = init + learning_rate * Σ tree(x)`
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    init: f64,
    learning_rate: f64,
    #[serde(default)]
    n_features: Option<usize>,
    trees: Vec<RegressionTree>,
}

impl TreeEnsemble {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScoringError::ArtifactMissing(shown.clone()),
            _ => ScoringError::invalid(&shown, e.to_string()),
        })?;

        let ensemble: TreeEnsemble = serde_json::from_str(&content)
            .map_err(|e| ScoringError::invalid(&shown, e.to_string()))?;
        ensemble
            .validate()
            .map_err(|message| ScoringError::invalid(&shown, message))?;

        tracing::debug!(
            path = %shown,
            trees = ensemble.trees.len(),
            "Loaded tree ensemble"
        );
        Ok(ensemble)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.init.is_finite() || !self.learning_rate.is_finite() {
            return Err("init and learning_rate must be finite".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for TreeEnsemble {
    fn predict(&self, features: &[f64]) -> Result<f64, ScoringError> {
        if let Some(n) = self.n_features {
            if features.len() != n {
                return Err(ScoringError::FeatureMismatch(format!(
                    "model expects {} features, got {}",
                    n,
                    features.len()
                )));
            }
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict(features)?;
        }
        Ok(self.init + self.learning_rate * sum)
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }
}

/// ONNX regressor: float input `[1, n_features]`, first output element
#[cfg(feature = "onnx")]
pub struct OnnxRegressor {
    session: Mutex<Session>,
}

#[cfg(feature = "onnx")]
impl OnnxRegressor {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let session = Session::builder()
            .map_err(|e| ScoringError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ScoringError::Model(e.to_string()))?
            .with_intra_threads(1)
            .map_err(|e| ScoringError::Model(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| ScoringError::Model(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

#[cfg(feature = "onnx")]
impl Regressor for OnnxRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, ScoringError> {
        let row: Vec<f32> = features.iter().map(|&x| x as f32).collect();
        let input = Array2::from_shape_vec((1, row.len()), row)
            .map_err(|e| ScoringError::Model(e.to_string()))?;
        let tensor = Tensor::from_array(input).map_err(|e| ScoringError::Model(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ScoringError::Model(e.to_string()))?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ScoringError::Model(e.to_string()))?;

        data.first()
            .map(|&y| y as f64)
            .ok_or_else(|| ScoringError::Model("empty model output".to_string()))
    }

    fn n_features(&self) -> Option<usize> {
        None
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
