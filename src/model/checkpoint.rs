//! Safetensors checkpoints: trained parameters plus optional class names.
//!
//! Parameters use torchvision state-dict names and may sit under a
//! `model_state_dict.` prefix. Class names live in the safetensors header
//! metadata as a JSON array under `class_names`.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use safetensors::SafeTensors;

use super::architecture::expected_parameters;
use crate::error::{ClassifierError, Result};

pub const STATE_DICT_PREFIX: &str = "model_state_dict.";
pub const CLASS_NAMES_KEY: &str = "class_names";

/// Batch-norm step counters carried by PyTorch exports; inference never reads them.
const IGNORED_SUFFIX: &str = "num_batches_tracked";

#[derive(Debug)]
pub struct Checkpoint {
    tensors: HashMap<String, Tensor>,
    class_names: Option<Vec<String>>,
}

impl Checkpoint {
    /// Reads the whole checkpoint file into memory and maps its tensors onto `device`.
    pub fn read<P: AsRef<Path>>(path: P, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ClassifierError::ModelFileMissing {
                path: path.to_path_buf(),
            },
            _ => ClassifierError::ModelLoad(format!("{}: {e}", path.display())),
        })?;
        log::debug!("Read {} bytes from {:?}", bytes.len(), path);
        Self::from_bytes(&bytes, device)
    }

    pub fn from_bytes(bytes: &[u8], device: &Device) -> Result<Self> {
        let (_, metadata) = SafeTensors::read_metadata(bytes)
            .map_err(|e| ClassifierError::ModelLoad(format!("invalid checkpoint header: {e}")))?;
        let class_names = match metadata.metadata().as_ref().and_then(|m| m.get(CLASS_NAMES_KEY)) {
            Some(raw) => Some(serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
                ClassifierError::ModelLoad(format!("malformed {CLASS_NAMES_KEY} metadata: {e}"))
            })?),
            None => None,
        };

        let raw = candle_core::safetensors::load_buffer(bytes, device)
            .map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;
        let mut tensors = HashMap::with_capacity(raw.len());
        for (name, tensor) in raw {
            if name.ends_with(IGNORED_SUFFIX) {
                continue;
            }
            let name = match name.strip_prefix(STATE_DICT_PREFIX) {
                Some(stripped) => stripped.to_string(),
                None => name,
            };
            let tensor = tensor
                .to_dtype(DType::F32)
                .map_err(|e| ClassifierError::ModelLoad(format!("{name}: {e}")))?;
            tensors.insert(name, tensor);
        }

        Ok(Self {
            tensors,
            class_names,
        })
    }

    pub fn class_names(&self) -> Option<&[String]> {
        self.class_names.as_deref()
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Checks names and shapes against the network built for `num_classes`.
    ///
    /// Mirrors a strict state-dict load: every missing, unexpected or
    /// misshapen parameter is reported in a single error.
    pub fn validate(&self, num_classes: usize) -> Result<()> {
        let expected = expected_parameters(num_classes);
        let mut problems = Vec::new();

        for (name, shape) in &expected {
            match self.tensors.get(name) {
                None => problems.push(format!("missing {name}")),
                Some(tensor) if tensor.dims() != shape.as_slice() => problems.push(format!(
                    "{name} has shape {:?}, expected {:?}",
                    tensor.dims(),
                    shape
                )),
                Some(_) => {}
            }
        }

        let known: HashSet<&str> = expected.iter().map(|(name, _)| name.as_str()).collect();
        let mut unexpected: Vec<&String> = self
            .tensors
            .keys()
            .filter(|name| !known.contains(name.as_str()))
            .collect();
        unexpected.sort();
        problems.extend(unexpected.into_iter().map(|name| format!("unexpected {name}")));

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ClassifierError::ModelShapeMismatch(problems.join("; ")))
        }
    }

    pub fn into_var_builder(self, device: &Device) -> VarBuilder<'static> {
        VarBuilder::from_tensors(self.tensors, DType::F32, device)
    }
}

/// Writes `tensors` as a checkpoint, recording `class_names` in the header when given.
pub fn save_checkpoint<P: AsRef<Path>>(
    path: P,
    tensors: &HashMap<String, Tensor>,
    class_names: Option<&[String]>,
) -> Result<()> {
    let metadata = match class_names {
        Some(names) => {
            let json = serde_json::to_string(names)
                .map_err(|e| ClassifierError::CheckpointWrite(e.to_string()))?;
            Some(HashMap::from([(CLASS_NAMES_KEY.to_string(), json)]))
        }
        None => None,
    };
    safetensors::serialize_to_file(
        tensors.iter().map(|(name, tensor)| (name.as_str(), tensor)),
        &metadata,
        path.as_ref(),
    )
    .map_err(|e| ClassifierError::CheckpointWrite(e.to_string()))
}

/// Snapshot of the parameters held by a [`VarMap`], keyed by checkpoint name.
pub fn varmap_tensors(varmap: &VarMap) -> HashMap<String, Tensor> {
    let data = varmap
        .data()
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    data.iter()
        .map(|(name, var)| (name.clone(), var.as_tensor().clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::architecture::SkinNet;

    fn fresh_tensors(num_classes: usize) -> HashMap<String, Tensor> {
        let (_, varmap) = SkinNet::init(num_classes, &Device::Cpu).unwrap();
        varmap_tensors(&varmap)
    }

    #[test]
    fn test_missing_file() {
        let err = Checkpoint::read("/nonexistent/dir/model.safetensors", &Device::Cpu).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelFileMissing { .. }));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.safetensors");
        fs::write(&path, "corrupted data").unwrap();

        let err = Checkpoint::read(&path, &Device::Cpu).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }

    #[test]
    fn test_class_names_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        let names: Vec<String> = ["Measles", "Acne", "Monkeypox", "Chickenpox"]
            .into_iter()
            .map(String::from)
            .collect();
        save_checkpoint(&path, &fresh_tensors(4), Some(&names)).unwrap();

        let checkpoint = Checkpoint::read(&path, &Device::Cpu).unwrap();
        assert_eq!(checkpoint.class_names(), Some(names.as_slice()));
        checkpoint.validate(4).unwrap();
    }

    #[test]
    fn test_prefix_and_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefixed.safetensors");
        let mut tensors: HashMap<String, Tensor> = fresh_tensors(4)
            .into_iter()
            .map(|(name, tensor)| (format!("{STATE_DICT_PREFIX}{name}"), tensor))
            .collect();
        let counter = Tensor::new(&[12i64], &Device::Cpu).unwrap();
        tensors.insert(format!("{STATE_DICT_PREFIX}bn1.num_batches_tracked"), counter);
        save_checkpoint(&path, &tensors, None).unwrap();

        let checkpoint = Checkpoint::read(&path, &Device::Cpu).unwrap();
        assert!(checkpoint.class_names().is_none());
        assert_eq!(checkpoint.len(), expected_parameters(4).len());
        checkpoint.validate(4).unwrap();
    }

    #[test]
    fn test_strict_validation() {
        let mut tensors = fresh_tensors(4);
        tensors.remove("layer3.1.bn2.running_var");
        let extra = Tensor::zeros(3, DType::F32, &Device::Cpu).unwrap();
        tensors.insert("fc.5.bias".to_string(), extra);

        let checkpoint = Checkpoint {
            tensors,
            class_names: None,
        };
        let err = checkpoint.validate(4).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ClassifierError::ModelShapeMismatch(_)));
        assert!(message.contains("missing layer3.1.bn2.running_var"), "{message}");
        assert!(message.contains("unexpected fc.5.bias"), "{message}");
    }

    #[test]
    fn test_head_width_mismatch() {
        let checkpoint = Checkpoint {
            tensors: fresh_tensors(4),
            class_names: None,
        };
        let err = checkpoint.validate(5).unwrap_err();
        assert!(err.to_string().contains("fc.3.weight has shape [4, 256], expected [5, 256]"));
    }

    #[test]
    fn test_malformed_class_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad-names.safetensors");
        let tensors = HashMap::from([(
            "fc.3.bias".to_string(),
            Tensor::zeros(4, DType::F32, &Device::Cpu).unwrap(),
        )]);
        let metadata = Some(HashMap::from([(
            CLASS_NAMES_KEY.to_string(),
            "not json".to_string(),
        )]));
        safetensors::serialize_to_file(
            tensors.iter().map(|(name, tensor)| (name.as_str(), tensor)),
            &metadata,
            &path,
        )
        .unwrap();

        let err = Checkpoint::read(&path, &Device::Cpu).unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }
}
