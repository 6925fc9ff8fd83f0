use std::env;
use std::path::PathBuf;

use crate::error::{ClassifierError, Result};
use crate::presenter::ConfidenceThreshold;

pub const DEFAULT_MODEL_PATH: &str = "skin_disease_classifier.safetensors";
pub const DEFAULT_NUM_CLASSES: usize = 4;

pub const MODEL_ENV: &str = "DERMACLASS_MODEL";
pub const NUM_CLASSES_ENV: &str = "DERMACLASS_NUM_CLASSES";
pub const THRESHOLD_ENV: &str = "DERMACLASS_THRESHOLD";
pub const CPU_ENV: &str = "DERMACLASS_CPU";

/// Knobs exposed to whatever front-end drives the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_path: PathBuf,
    pub num_classes: usize,
    pub threshold: ConfidenceThreshold,
    pub force_cpu: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            num_classes: DEFAULT_NUM_CLASSES,
            threshold: ConfidenceThreshold::DEFAULT,
            force_cpu: false,
        }
    }
}

impl Settings {
    /// Defaults overridden by any `DERMACLASS_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(path) = lookup(MODEL_ENV) {
            settings.model_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(NUM_CLASSES_ENV) {
            settings.num_classes = raw.trim().parse().map_err(|e| {
                ClassifierError::InvalidConfig(format!("{NUM_CLASSES_ENV}={raw:?}: {e}"))
            })?;
        }
        if let Some(raw) = lookup(THRESHOLD_ENV) {
            settings.threshold = raw.parse()?;
        }
        if let Some(raw) = lookup(CPU_ENV) {
            settings.force_cpu = parse_flag(&raw).ok_or_else(|| {
                ClassifierError::InvalidConfig(format!("{CPU_ENV}={raw:?} is not a boolean"))
            })?;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(ClassifierError::InvalidConfig(
                "number of classes must be at least 1".into(),
            ));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(ClassifierError::InvalidConfig("model path is empty".into()));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
