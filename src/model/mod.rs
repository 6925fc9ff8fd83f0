//! Loading the trained network and running it.

pub mod architecture;
pub mod checkpoint;
pub mod device;
pub mod loader;
pub mod manager;
pub mod predictor;
pub mod traits;

pub use architecture::SkinNet;
pub use checkpoint::{save_checkpoint, varmap_tensors, Checkpoint};
pub use device::select_device;
pub use loader::LoadedModel;
pub use manager::{load_model, ModelManager};
pub use predictor::{predict_image, ClassProbability, PredictionResult};
pub use traits::ImageClassifier;
