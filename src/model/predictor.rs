use std::time::Instant;

use candle_core::{DType, D};
use image::DynamicImage;
use serde::Serialize;

use super::traits::ImageClassifier;
use crate::error::{ClassifierError, Result};
use crate::preprocess::ImageTransform;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub label: String,
    pub probability: f32,
}

/// Outcome of one forward pass.
///
/// `confidence` is the probability at `index`, and `index` is the first
/// position holding the largest probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub index: usize,
    pub label: String,
    pub confidence: f32,
    /// Softmax output in label order
    pub probabilities: Vec<ClassProbability>,
}

impl PredictionResult {
    /// Pairs softmax output with its labels and picks the top class.
    ///
    /// Ties go to the lowest index.
    pub fn from_probabilities(class_names: &[String], probabilities: Vec<f32>) -> Result<Self> {
        if probabilities.len() != class_names.len() {
            return Err(ClassifierError::ModelShapeMismatch(format!(
                "network produced {} scores for {} class names",
                probabilities.len(),
                class_names.len()
            )));
        }

        let (index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, p)| match best {
                Some((_, top)) if p <= top => best,
                Some(_) if p.is_nan() => best,
                _ => Some((i, p)),
            })
            .ok_or_else(|| ClassifierError::ModelShapeMismatch("network has no classes".into()))?;

        let probabilities = class_names
            .iter()
            .zip(probabilities)
            .map(|(label, probability)| ClassProbability {
                label: label.clone(),
                probability,
            })
            .collect();

        Ok(Self {
            index,
            label: class_names[index].clone(),
            confidence,
            probabilities,
        })
    }

    /// Probabilities sorted from most to least likely. Equal values keep label order.
    pub fn ranked(&self) -> Vec<(usize, &ClassProbability)> {
        let mut ranked: Vec<_> = self.probabilities.iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.probability.total_cmp(&a.1.probability));
        ranked
    }

    /// Gap between the two most likely classes.
    pub fn margin(&self) -> f32 {
        let ranked = self.ranked();
        match ranked.get(1) {
            Some((_, runner_up)) => self.confidence - runner_up.probability,
            None => self.confidence,
        }
    }

    pub fn probability_values(&self) -> Vec<f32> {
        self.probabilities.iter().map(|p| p.probability).collect()
    }

    pub fn class_names(&self) -> Vec<String> {
        self.probabilities.iter().map(|p| p.label.clone()).collect()
    }
}

/// Classifies a single image.
///
/// Preprocesses it, adds a batch dimension, moves it to the model's device,
/// runs one inference-mode forward pass and applies softmax over the class
/// dimension.
pub fn predict_image<M: ImageClassifier + ?Sized>(
    image: &DynamicImage,
    model: &M,
    transform: &ImageTransform,
) -> Result<PredictionResult> {
    let input = transform
        .apply(image)?
        .unsqueeze(0)?
        .to_device(model.device())?;

    let start = Instant::now();
    let logits = model.forward(&input)?;
    let probabilities = candle_nn::ops::softmax(&logits, D::Minus1)?
        .squeeze(0)?
        .to_dtype(DType::F32)?
        .to_vec1::<f32>()?;
    log::debug!("Forward pass took {:.2?}", start.elapsed());

    let result = PredictionResult::from_probabilities(model.class_names(), probabilities)?;
    log::info!(
        "Predicted {} with confidence {:.2}%",
        result.label,
        result.confidence * 100.0
    );
    Ok(result)
}
