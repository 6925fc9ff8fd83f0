use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::Device;
use dermaclass::model::{save_checkpoint, varmap_tensors, SkinNet};
use dermaclass::{
    decode_image, get_disease_info, get_transforms, load_model, predict_image, present,
    ClassifierError, ConfidenceThreshold, ImageClassifier,
};
use env_logger::{Builder, Env};
use image::{DynamicImage, Rgb, RgbImage};

// Initialize test logger
fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

fn write_checkpoint(dir: &Path, class_names: Option<&[String]>) -> PathBuf {
    let path = dir.join("skin_disease_classifier.safetensors");
    let (_, varmap) = SkinNet::init(4, &Device::Cpu).unwrap();
    save_checkpoint(&path, &varmap_tensors(&varmap), class_names).unwrap();
    path
}

fn test_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(512, 384, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

#[test]
fn test_end_to_end_prediction() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let dir = tempfile::tempdir()?;
    let path = write_checkpoint(dir.path(), None);

    let model = load_model(&path, 4)?;
    assert_eq!(model.class_names(), &["Acne", "Chickenpox", "Measles", "Monkeypox"]);

    let transform = get_transforms();
    let result = predict_image(&test_image(), model.as_ref(), &transform)?;

    let values = result.probability_values();
    assert_eq!(values.len(), 4);
    assert!((values.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));

    let max = values.iter().copied().fold(f32::MIN, f32::max);
    let first_max = values.iter().position(|&p| p == max).unwrap();
    assert_eq!(result.confidence, max);
    assert_eq!(result.index, first_max);
    assert_eq!(result.label, model.class_names()[first_max]);

    let report = present(&result, ConfidenceThreshold::new(result.confidence)?);
    assert!(report.is_reliable());
    assert!(report.to_string().contains(get_disease_info(&result.label).description));
    Ok(())
}

#[test]
fn test_repeated_predictions_are_identical() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let dir = tempfile::tempdir()?;
    let path = write_checkpoint(dir.path(), None);
    let model = load_model(&path, 4)?;
    let transform = get_transforms();

    let first = predict_image(&test_image(), model.as_ref(), &transform)?;
    let second = predict_image(&test_image(), model.as_ref(), &transform)?;
    let first_bits: Vec<u32> = first.probability_values().iter().map(|p| p.to_bits()).collect();
    let second_bits: Vec<u32> = second.probability_values().iter().map(|p| p.to_bits()).collect();
    assert_eq!(first_bits, second_bits);
    Ok(())
}

#[test]
fn test_global_cache_returns_same_model() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let dir = tempfile::tempdir()?;
    let names: Vec<String> = ["Measles", "Monkeypox", "Acne", "Chickenpox"]
        .into_iter()
        .map(String::from)
        .collect();
    let path = write_checkpoint(dir.path(), Some(&names));

    let first = load_model(&path, 4)?;
    let second = load_model(&path, 4)?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.class_names(), names.as_slice());
    Ok(())
}

#[test]
fn test_bad_upload_does_not_poison_model() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let dir = tempfile::tempdir()?;
    let path = write_checkpoint(dir.path(), None);
    let model = load_model(&path, 4)?;

    let err = decode_image(b"GIF89a but not really").unwrap_err();
    assert!(matches!(err, ClassifierError::ImageDecode(_)));
    assert!(!err.is_fatal());

    let result = predict_image(&test_image(), model.as_ref(), &get_transforms())?;
    assert_eq!(result.probabilities.len(), 4);
    Ok(())
}

#[test]
fn test_missing_model_file() {
    init();
    let err = load_model("/nonexistent/skin_disease_classifier.safetensors", 4).unwrap_err();
    assert!(matches!(err, ClassifierError::ModelFileMissing { .. }));
    assert!(err.is_fatal());
}
