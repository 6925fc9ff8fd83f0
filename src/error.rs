use std::path::PathBuf;

/// Errors raised while loading the classifier or running a prediction.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The checkpoint path does not resolve to a readable file
    #[error("model file not found: {}", path.display())]
    ModelFileMissing { path: PathBuf },
    /// Checkpoint parameters do not line up with the network
    #[error("checkpoint does not match the network: {0}")]
    ModelShapeMismatch(String),
    /// The checkpoint exists but could not be read or parsed
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    /// Uploaded bytes are not a decodable image
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
    /// Backend failure during the forward pass
    #[error("inference failed: {0}")]
    Inference(#[from] candle_core::Error),
    #[error("failed to write checkpoint: {0}")]
    CheckpointWrite(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClassifierError {
    /// Load-time errors leave the process without a usable classifier.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ModelFileMissing { .. } | Self::ModelShapeMismatch(_) | Self::ModelLoad(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_split() {
        let missing = ClassifierError::ModelFileMissing {
            path: PathBuf::from("nope.safetensors"),
        };
        assert!(missing.is_fatal());
        assert!(ClassifierError::ModelShapeMismatch("fc.3.weight".into()).is_fatal());
        assert!(!ClassifierError::InvalidConfig("threshold".into()).is_fatal());

        let decode = image::load_from_memory(b"not an image").unwrap_err();
        assert!(!ClassifierError::from(decode).is_fatal());
    }

    #[test]
    fn test_missing_file_message() {
        let err = ClassifierError::ModelFileMissing {
            path: PathBuf::from("skin_disease_classifier.safetensors"),
        };
        assert_eq!(
            err.to_string(),
            "model file not found: skin_disease_classifier.safetensors"
        );
    }
}
