use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use toxicity_pre_processing::pre_processor::{
    DEFAULT_MAX_SEQUENCE_LENGTH, EncoderParams, NormalizationConfig, PaddingSide,
};
use tracing::debug;

use crate::{error::PredictError, model::{CLASSIFICATION_THRESHOLD, OnnxModelConfig}};

pub const ENV_VOCABULARY_PATH: &str = "TOXICITY_VOCABULARY_PATH";
pub const ENV_MODEL_PATH: &str = "TOXICITY_MODEL_PATH";
pub const ENV_MAX_SEQUENCE_LENGTH: &str = "TOXICITY_MAX_SEQUENCE_LENGTH";
pub const ENV_THRESHOLD: &str = "TOXICITY_THRESHOLD";

/// Rejects thresholds outside [0, 1], NaN included.
pub(crate) fn check_threshold(threshold: f32) -> Result<(), PredictError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(PredictError::Configuration(format!(
            "threshold must be within [0, 1], got {threshold}"
        )))
    }
}

/// Everything needed to stand up a [`Predictor`](crate::Predictor).
///
/// Loaded from a JSON file, then overridden by `TOXICITY_*` environment
/// variables. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub vocabulary_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub max_sequence_length: usize,
    pub padding: PaddingSide,
    pub threshold: f32,
    pub normalization: NormalizationConfig,
    pub model: OnnxModelConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            vocabulary_path: None,
            model_path: None,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            padding: PaddingSide::Post,
            threshold: CLASSIFICATION_THRESHOLD,
            normalization: NormalizationConfig::default(),
            model: OnnxModelConfig::default(),
        }
    }
}

impl InferenceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PredictError> {
        serde_json::from_str(json)
            .map_err(|e| PredictError::Configuration(format!("invalid config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PredictError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            PredictError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Read inference config");
        Self::from_json_str(&json)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, PredictError> {
        Self::default().apply_env()
    }

    pub fn apply_env(self) -> Result<Self, PredictError> {
        self.apply_vars(|key| env::var(key).ok())
    }

    /// Apply overrides from any key/value source. Empty values are ignored.
    pub fn apply_vars(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PredictError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = get(ENV_VOCABULARY_PATH) {
            self.vocabulary_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get(ENV_MODEL_PATH) {
            self.model_path = Some(PathBuf::from(path));
        }
        if let Some(len) = get(ENV_MAX_SEQUENCE_LENGTH) {
            self.max_sequence_length = len.trim().parse().map_err(|_| {
                PredictError::Configuration(format!(
                    "{ENV_MAX_SEQUENCE_LENGTH} must be a positive integer, got {len:?}"
                ))
            })?;
        }
        if let Some(threshold) = get(ENV_THRESHOLD) {
            self.threshold = threshold.trim().parse().map_err(|_| {
                PredictError::Configuration(format!(
                    "{ENV_THRESHOLD} must be a number, got {threshold:?}"
                ))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), PredictError> {
        if self.max_sequence_length == 0 {
            return Err(PredictError::Configuration(
                "max_sequence_length must be greater than zero".to_owned(),
            ));
        }
        check_threshold(self.threshold)?;
        match self.model.sequence_length {
            Some(model_len) if model_len != self.max_sequence_length => {
                Err(PredictError::InputShapeMismatch {
                    model: model_len,
                    encoder: self.max_sequence_length,
                })
            }
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn encoder_params(&self) -> EncoderParams {
        EncoderParams::new(self.max_sequence_length, self.padding)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = InferenceConfig::default();
        assert_eq!(config.max_sequence_length, 210);
        assert_eq!(config.padding, PaddingSide::Post);
        assert!((config.threshold - 0.5).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = InferenceConfig::from_json_str(
            r#"{"vocabulary_path": "vocab.json", "padding": "pre", "model": {"input_kind": "int64"}}"#,
        )
        .unwrap();
        assert_eq!(config.vocabulary_path, Some(PathBuf::from("vocab.json")));
        assert_eq!(config.padding, PaddingSide::Pre);
        assert_eq!(config.max_sequence_length, 210);
        assert_eq!(config.model.input_kind, crate::model::InputKind::Int64);
        assert_eq!(config.model.intra_threads, 4);
    }

    #[test]
    fn env_overrides_file_values() {
        let config = InferenceConfig {
            max_sequence_length: 100,
            ..InferenceConfig::default()
        }
        .apply_vars(vars(&[
            (ENV_MODEL_PATH, "/models/toxic.onnx"),
            (ENV_MAX_SEQUENCE_LENGTH, "64"),
            (ENV_THRESHOLD, "0.7"),
            (ENV_VOCABULARY_PATH, ""),
        ]))
        .unwrap();
        assert_eq!(config.model_path, Some(PathBuf::from("/models/toxic.onnx")));
        assert_eq!(config.vocabulary_path, None);
        assert_eq!(config.max_sequence_length, 64);
        assert!((config.threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn bad_env_value_is_a_configuration_error() {
        let err = InferenceConfig::default()
            .apply_vars(vars(&[(ENV_MAX_SEQUENCE_LENGTH, "many")]))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero_len = InferenceConfig {
            max_sequence_length: 0,
            ..InferenceConfig::default()
        };
        assert!(matches!(
            zero_len.validate(),
            Err(PredictError::Configuration(_))
        ));

        for threshold in [1.5, -0.1, f32::NAN] {
            let bad_threshold = InferenceConfig {
                threshold,
                ..InferenceConfig::default()
            };
            assert!(matches!(
                bad_threshold.validate(),
                Err(PredictError::Configuration(_))
            ));
        }

        let mismatch = InferenceConfig {
            model: OnnxModelConfig {
                sequence_length: Some(100),
                ..OnnxModelConfig::default()
            },
            ..InferenceConfig::default()
        };
        assert!(matches!(
            mismatch.validate(),
            Err(PredictError::InputShapeMismatch {
                model: 100,
                encoder: 210
            })
        ));
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toxicity.json");
        fs::write(&path, r#"{"threshold": 0.6, "normalization": {"bert_mode": true}}"#).unwrap();
        let config = InferenceConfig::from_file(&path).unwrap();
        assert!((config.threshold - 0.6).abs() < f32::EPSILON);
        assert!(config.normalization.bert_mode);

        let missing = InferenceConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(missing.is_configuration());
    }
}
