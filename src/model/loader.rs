use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::ModuleT;

use super::architecture::SkinNet;
use super::checkpoint::Checkpoint;
use super::traits::ImageClassifier;
use crate::error::{ClassifierError, Result};
use crate::knowledge::default_class_names;

/// A trained classifier bound to its device, ready for inference.
///
/// Never mutated after construction; share it behind an `Arc`.
pub struct LoadedModel {
    net: SkinNet,
    class_names: Vec<String>,
    device: Device,
    path: PathBuf,
}

// Compile-time verification of thread-safety
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<LoadedModel>();
};

impl LoadedModel {
    /// Builds the network for `num_classes` and binds the checkpoint at `path` onto it.
    ///
    /// Class names come from the checkpoint metadata when present and fall back to
    /// the default disease order otherwise. The fallback only fits a four-class
    /// head: a checkpoint without names and any other `num_classes` is rejected
    /// with [`ClassifierError::ModelShapeMismatch`].
    pub fn load<P: AsRef<Path>>(path: P, num_classes: usize, device: Device) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading model from {:?} ({} classes) on {:?}", path, num_classes, device);
        let start = Instant::now();

        let checkpoint = Checkpoint::read(path, &device)?;
        checkpoint.validate(num_classes)?;

        let class_names = match checkpoint.class_names() {
            Some(names) => names.to_vec(),
            None => {
                log::warn!(
                    "Checkpoint {:?} carries no class names, assuming default order",
                    path
                );
                default_class_names()
            }
        };
        if class_names.len() != num_classes {
            return Err(ClassifierError::ModelShapeMismatch(format!(
                "{} class names for a {}-class head",
                class_names.len(),
                num_classes
            )));
        }

        let vb = checkpoint.into_var_builder(&device);
        let net = SkinNet::new(vb, num_classes)
            .map_err(|e| ClassifierError::ModelShapeMismatch(e.to_string()))?;

        log::info!("Model ready in {:.2?}, classes: {:?}", start.elapsed(), class_names);
        Ok(Self {
            net,
            class_names,
            device,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_classes(&self) -> usize {
        self.net.num_classes()
    }

    /// Always false: dropout stays off and batch norm uses running statistics.
    pub fn is_training(&self) -> bool {
        false
    }
}

impl ImageClassifier for LoadedModel {
    fn forward(&self, batch: &Tensor) -> candle_core::Result<Tensor> {
        // Checkpoint tensors are plain tensors, not vars, so no gradient graph is recorded.
        self.net.forward_t(batch, self.is_training())
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("path", &self.path)
            .field("class_names", &self.class_names)
            .field("device", &self.device)
            .finish()
    }
}
