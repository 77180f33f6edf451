//! Standard (z-score) scaler with previously fitted parameters

use std::path::Path;

use ndarray::Array1;
use serde::Deserialize;

use crate::features::FeatureVector;
use crate::ScoringError;

#[derive(Debug, Deserialize)]
struct ScalerFile {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
    #[serde(default = "default_true")]
    with_mean: bool,
    #[serde(default = "default_true")]
    with_std: bool,
}

fn default_true() -> bool {
    true
}

/// Fitted standard scaler
///
/// Computes `(x - mean) / scale` per column. Never refits.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Build from fitted parameters
    ///
    /// A zero scale entry (constant column during fitting) is treated as 1.
    pub fn new(
        feature_names: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    ) -> Result<Self, ScoringError> {
        let n = feature_names.len();
        if n == 0 {
            return Err(ScoringError::FeatureMismatch(
                "scaler has no features".to_string(),
            ));
        }
        if mean.len() != n || scale.len() != n {
            return Err(ScoringError::FeatureMismatch(format!(
                "scaler has {} names, {} means, {} scales",
                n,
                mean.len(),
                scale.len()
            )));
        }
        if mean.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(ScoringError::FeatureMismatch(
                "scaler parameters must be finite".to_string(),
            ));
        }

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect::<Vec<_>>();

        Ok(Self {
            feature_names,
            mean: Array1::from(mean),
            scale: Array1::from(scale),
        })
    }

    /// Load fitted parameters from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScoringError::ArtifactMissing(shown.clone()),
            _ => ScoringError::invalid(&shown, e.to_string()),
        })?;

        let file: ScalerFile = serde_json::from_str(&content)
            .map_err(|e| ScoringError::invalid(&shown, e.to_string()))?;

        let n = file.feature_names.len();
        let mean = if file.with_mean { file.mean } else { vec![0.0; n] };
        let scale = if file.with_std { file.scale } else { vec![1.0; n] };

        Self::new(file.feature_names, mean, scale)
            .map_err(|e| ScoringError::invalid(&shown, e.to_string()))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Scale a feature row
    ///
    /// The row must carry exactly the fitted columns in the fitted order.
    pub fn transform(&self, vector: &FeatureVector) -> Result<Vec<f64>, ScoringError> {
        if vector.len() != self.n_features() {
            return Err(ScoringError::FeatureMismatch(format!(
                "expected {} features, got {}",
                self.n_features(),
                vector.len()
            )));
        }
        if let Some((expected, got)) = self
            .feature_names
            .iter()
            .zip(vector.names())
            .find(|(expected, got)| expected.as_str() != *got)
        {
            return Err(ScoringError::FeatureMismatch(format!(
                "expected column {:?}, got {:?}",
                expected, got
            )));
        }

        let row = Array1::from(vector.to_numeric()?);
        let scaled = (row - &self.mean) / &self.scale;
        Ok(scaled.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureValue;
    use std::io::Write;

    fn vector(values: &[(&str, f64)]) -> FeatureVector {
        let mut v = FeatureVector::new();
        for (name, value) in values {
            v.push(*name, FeatureValue::Number(*value));
        }
        v
    }

    fn scaler() -> StandardScaler {
        StandardScaler::new(
            vec!["a".to_string(), "b".to_string()],
            vec![10.0, 0.0],
            vec![2.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_transform_uses_fitted_parameters() {
        let scaled = scaler().transform(&vector(&[("a", 14.0), ("b", 3.0)])).unwrap();
        // zero scale behaves as 1
        assert_eq!(scaled, vec![2.0, 3.0]);
    }

    #[test]
    fn test_rejects_wrong_count_and_order() {
        let s = scaler();
        assert!(matches!(
            s.transform(&vector(&[("a", 1.0)])),
            Err(ScoringError::FeatureMismatch(_))
        ));
        assert!(matches!(
            s.transform(&vector(&[("b", 1.0), ("a", 1.0)])),
            Err(ScoringError::FeatureMismatch(_))
        ));
    }

    #[test]
    fn test_rejects_unencoded_label() {
        let mut v = vector(&[("a", 1.0)]);
        v.push("b", FeatureValue::Label("Sideways".to_string()));
        assert!(matches!(
            scaler().transform(&v),
            Err(ScoringError::NonNumeric { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"feature_names":["a","b"],"mean":[1.0,2.0],"scale":[1.0,4.0],"with_mean":false,"with_std":true}}"#
        )
        .unwrap();

        let s = StandardScaler::from_file(file.path()).unwrap();
        assert_eq!(s.n_features(), 2);
        let scaled = s.transform(&vector(&[("a", 3.0), ("b", 8.0)])).unwrap();
        assert_eq!(scaled, vec![3.0, 2.0]);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        assert!(matches!(
            StandardScaler::from_file("/nonexistent/scaler.json"),
            Err(ScoringError::ArtifactMissing(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"feature_names":["a"],"mean":[],"scale":[1.0]}}"#).unwrap();
        assert!(matches!(
            StandardScaler::from_file(file.path()),
            Err(ScoringError::InvalidArtifact { .. })
        ));
    }
}
