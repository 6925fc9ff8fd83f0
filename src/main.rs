use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use dermaclass::config::{Settings, MODEL_ENV};
use dermaclass::{
    get_transforms, open_image, predict_image, present, ClassifierError, ConfidenceThreshold,
    ImageTransform, LoadedModel, ModelManager,
};

/// Classifies a skin image as Acne, Chickenpox, Measles or Monkeypox.
///
/// Educational use only: this is not a medical diagnosis.
///
/// Unset options fall back to DERMACLASS_MODEL, DERMACLASS_NUM_CLASSES,
/// DERMACLASS_THRESHOLD and DERMACLASS_CPU, then to the built-in defaults.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to analyse. Without it, image paths are read from stdin, one per line
    image: Option<PathBuf>,

    /// Trained checkpoint [default: skin_disease_classifier.safetensors]
    #[arg(long)]
    model: Option<PathBuf>,

    /// Width of the classification head [default: 4]
    #[arg(long)]
    num_classes: Option<usize>,

    /// Minimum confidence for a reliable diagnosis, between 0 and 1 [default: 0.5]
    #[arg(long)]
    threshold: Option<ConfidenceThreshold>,

    /// Skip GPU detection
    #[arg(long)]
    cpu: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Command-line options layered over `base`.
    fn settings_over(&self, mut base: Settings) -> Settings {
        if let Some(model) = &self.model {
            base.model_path = model.clone();
        }
        if let Some(num_classes) = self.num_classes {
            base.num_classes = num_classes;
        }
        if let Some(threshold) = self.threshold {
            base.threshold = threshold;
        }
        base.force_cpu |= self.cpu;
        base
    }
}

fn main() -> Result<()> {
    dermaclass::init_logger();
    let args = Args::parse();
    let settings = args.settings_over(Settings::from_env()?);
    settings.validate()?;

    info!("=== Skin condition classifier ===");
    let manager = ModelManager::new().with_cpu(settings.force_cpu);
    let model = match manager.load_model(&settings.model_path, settings.num_classes) {
        Ok(model) => model,
        Err(e) => {
            error!("Failed to load model: {}", e);
            eprintln!("Could not load the model: {e}");
            if let ClassifierError::ModelFileMissing { .. } = e {
                eprintln!(
                    "Make sure '{}' is in the working directory, or point {MODEL_ENV} at it.",
                    settings.model_path.display()
                );
            }
            process::exit(1);
        }
    };
    let transform = get_transforms();

    match &args.image {
        Some(path) => {
            if let Err(e) = classify(path, &model, &transform, &settings, args.json) {
                eprintln!("Could not analyse {}: {e:#}", path.display());
                process::exit(2);
            }
        }
        None => {
            info!("Reading image paths from stdin");
            for line in io::stdin().lock().lines() {
                let line = line.context("failed to read image path from stdin")?;
                let path = Path::new(line.trim());
                if path.as_os_str().is_empty() {
                    continue;
                }
                if let Err(e) = classify(path, &model, &transform, &settings, args.json) {
                    error!("Request for {:?} failed: {:#}", path, e);
                    eprintln!("Could not analyse {}: {e:#}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn classify(
    path: &Path,
    model: &LoadedModel,
    transform: &ImageTransform,
    settings: &Settings,
    json: bool,
) -> Result<()> {
    let image = open_image(path).with_context(|| format!("failed to open {}", path.display()))?;
    let result = predict_image(&image, model, transform)?;
    let report = present(&result, settings.threshold);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_base_settings() {
        let base = Settings {
            model_path: PathBuf::from("/env/model.safetensors"),
            num_classes: 6,
            threshold: ConfidenceThreshold::new(0.7).unwrap(),
            force_cpu: true,
        };

        let args = Args::try_parse_from(["dermaclass"]).unwrap();
        assert_eq!(args.settings_over(base.clone()), base);

        let args = Args::try_parse_from([
            "dermaclass",
            "--model",
            "cli.safetensors",
            "--num-classes",
            "4",
            "--threshold",
            "0.9",
            "lesion.jpg",
        ])
        .unwrap();
        let settings = args.settings_over(base);
        assert_eq!(settings.model_path, PathBuf::from("cli.safetensors"));
        assert_eq!(settings.num_classes, 4);
        assert_eq!(settings.threshold.value(), 0.9);
        assert!(settings.force_cpu);
        assert_eq!(args.image, Some(PathBuf::from("lesion.jpg")));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        assert!(Args::try_parse_from(["dermaclass", "--threshold", "1.5"]).is_err());
    }
}
