//! Skin condition classifier: a ResNet-18 with a small classification head,
//! plus the preprocessing, lookup and presentation around it.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use dermaclass::{get_transforms, load_model, open_image, predict_image, present, ConfidenceThreshold};
//!
//! let model = load_model("skin_disease_classifier.safetensors", 4)?;
//! let image = open_image("lesion.jpg")?;
//! let result = predict_image(&image, model.as_ref(), &get_transforms())?;
//! println!("{}", present(&result, ConfidenceThreshold::DEFAULT));
//! # Ok(())
//! # }
//! ```
//!
//! Output is advisory only and is no substitute for a medical diagnosis.

pub mod config;
pub mod error;
pub mod knowledge;
pub mod model;
pub mod preprocess;
pub mod presenter;

pub use config::Settings;
pub use error::{ClassifierError, Result};
pub use knowledge::{get_disease_info, Disease, DiseaseRecord};
pub use model::{
    load_model, predict_image, ImageClassifier, LoadedModel, ModelManager, PredictionResult,
};
pub use preprocess::{decode_image, get_transforms, open_image, ImageTransform};
pub use presenter::{display_probabilities, present, Assessment, ConfidenceThreshold, Report};

pub fn init_logger() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
}
