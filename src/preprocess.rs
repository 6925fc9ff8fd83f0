//! Image preprocessing matching the validation transforms used at training time.
//!
//! The pipeline is resize → center crop → scale → normalize. The constants
//! must stay identical to the ones the checkpoint was trained with; a
//! mismatch degrades accuracy without raising any error.

use std::path::Path;

use candle_core::{Device, Tensor};
use image::imageops::{self, FilterType};
use image::DynamicImage;

use crate::error::Result;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
pub const RESIZE_TO: u32 = 256;
pub const CROP_TO: u32 = 224;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageTransform {
    pub resize: u32,
    pub crop: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self {
            resize: RESIZE_TO,
            crop: CROP_TO,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

/// Returns the transform the classifier expects.
pub fn get_transforms() -> ImageTransform {
    ImageTransform::default()
}

impl ImageTransform {
    /// Shape of the tensor produced by [`ImageTransform::apply`].
    pub fn output_dims(&self) -> (usize, usize, usize) {
        (3, self.crop as usize, self.crop as usize)
    }

    /// Converts an image of any size into a normalized `(3, crop, crop)` CHW tensor on the CPU.
    pub fn apply(&self, image: &DynamicImage) -> Result<Tensor> {
        let rgb = image.to_rgb8();
        let resized = imageops::resize(&rgb, self.resize, self.resize, FilterType::Triangle);

        // Offsets round half away from zero, matching torchvision's CenterCrop.
        let offset = ((self.resize.saturating_sub(self.crop)) as f32 / 2.0).round() as u32;
        let cropped = imageops::crop_imm(&resized, offset, offset, self.crop, self.crop).to_image();

        let (width, height) = cropped.dimensions();
        let num_pixels = (width * height) as usize;
        let mut chw = vec![0.0f32; 3 * num_pixels];
        for (i, pixel) in cropped.pixels().enumerate() {
            for c in 0..3 {
                let scaled = pixel[c] as f32 / 255.0;
                chw[c * num_pixels + i] = (scaled - self.mean[c]) / self.std[c];
            }
        }

        let tensor = Tensor::from_vec(chw, (3, height as usize, width as usize), &Device::Cpu)?;
        Ok(tensor)
    }
}

/// Decodes uploaded bytes into an image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

pub fn open_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}
