use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::{Lazy, OnceCell};

use super::device::select_device;
use super::loader::LoadedModel;
use crate::error::Result;

type ModelKey = (PathBuf, usize);

/// Process-lifetime cache of loaded models keyed by `(path, num_classes)`.
///
/// The mutex only guards the key table. Each key owns its own cell, so
/// concurrent first requests for one key trigger a single load while the
/// others wait on that cell, and loads for different keys do not block
/// each other. A failed load leaves the cell empty for the next caller.
pub struct ModelManager {
    models: Mutex<HashMap<ModelKey, Arc<OnceCell<Arc<LoadedModel>>>>>,
    force_cpu: bool,
}

static MODEL_MANAGER: Lazy<ModelManager> = Lazy::new(ModelManager::new);

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    pub fn new() -> Self {
        Self {
            models: Mutex::new(HashMap::new()),
            force_cpu: false,
        }
    }

    /// Skip the accelerator probe and always load onto the CPU.
    pub fn with_cpu(mut self, force_cpu: bool) -> Self {
        self.force_cpu = force_cpu;
        self
    }

    /// The process-wide manager used by [`load_model`].
    pub fn global() -> &'static ModelManager {
        &MODEL_MANAGER
    }

    pub fn load_model<P: AsRef<Path>>(&self, path: P, num_classes: usize) -> Result<Arc<LoadedModel>> {
        let path = path.as_ref().to_path_buf();
        let cell = {
            let mut models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(models.entry((path.clone(), num_classes)).or_default())
        };

        let model = cell.get_or_try_init(|| {
            let device = select_device(self.force_cpu)?;
            LoadedModel::load(&path, num_classes, device).map(Arc::new)
        })?;
        Ok(Arc::clone(model))
    }

    pub fn is_loaded<P: AsRef<Path>>(&self, path: P, num_classes: usize) -> bool {
        let models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
        models
            .get(&(path.as_ref().to_path_buf(), num_classes))
            .map_or(false, |cell| cell.get().is_some())
    }
}

/// Loads the classifier at `path`, reusing the cached instance after the first call.
pub fn load_model<P: AsRef<Path>>(path: P, num_classes: usize) -> Result<Arc<LoadedModel>> {
    ModelManager::global().load_model(path, num_classes)
}
