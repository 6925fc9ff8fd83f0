use candle_core::{Device, Result, Tensor};

/// A network that maps a batch of preprocessed images to raw class scores.
pub trait ImageClassifier: Send + Sync {
    /// Runs one inference-mode forward pass over a `(batch, 3, H, W)` tensor
    /// and returns `(batch, num_classes)` scores.
    fn forward(&self, batch: &Tensor) -> Result<Tensor>;

    /// Labels indexed by output position.
    fn class_names(&self) -> &[String];

    fn device(&self) -> &Device;
}
