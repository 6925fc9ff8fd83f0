//! Turns a prediction into something a person can read.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ClassifierError, Result};
use crate::knowledge::{get_disease_info, DiseaseRecord};
use crate::model::PredictionResult;

const BAR_WIDTH: usize = 30;

const RECOMMENDATIONS: &str = "\
Important: this automatic diagnosis is indicative only.
We recommend that you:
  - consult a dermatologist or a doctor
  - do not self-medicate
  - monitor how the symptoms evolve
  - book an appointment quickly if the symptoms get worse";

/// Minimum probability for a prediction to be presented as reliable.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
    pub const DEFAULT: ConfidenceThreshold = ConfidenceThreshold(0.5);

    /// Accepts values in `[0, 1]`, bounds included.
    pub fn new(value: f32) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ClassifierError::InvalidConfig(format!(
                "confidence threshold must be within [0, 1], got {value}"
            )))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn is_met_by(self, confidence: f32) -> bool {
        confidence >= self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for ConfidenceThreshold {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().parse::<f32>().map_err(|e| {
            ClassifierError::InvalidConfig(format!("confidence threshold {s:?}: {e}"))
        })?;
        Self::new(value)
    }
}

impl fmt::Display for ConfidenceThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Assessment {
    /// Confidence met the threshold
    Reliable { record: &'static DiseaseRecord },
    /// Confidence fell short of `threshold`
    Uncertain { threshold: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProbability {
    pub label: String,
    pub probability: f32,
    pub predicted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub label: String,
    pub confidence: f32,
    pub assessment: Assessment,
    /// Every class, most likely first
    pub probabilities: Vec<RankedProbability>,
}

impl Report {
    pub fn is_reliable(&self) -> bool {
        matches!(self.assessment, Assessment::Reliable { .. })
    }
}

/// Builds the report for `result`. A confidence equal to the threshold counts as reliable.
pub fn present(result: &PredictionResult, threshold: ConfidenceThreshold) -> Report {
    let assessment = if threshold.is_met_by(result.confidence) {
        Assessment::Reliable {
            record: get_disease_info(&result.label),
        }
    } else {
        Assessment::Uncertain {
            threshold: threshold.value(),
        }
    };

    let probabilities = result
        .ranked()
        .into_iter()
        .map(|(index, class)| RankedProbability {
            label: class.label.clone(),
            probability: class.probability,
            predicted: index == result.index,
        })
        .collect();

    Report {
        label: result.label.clone(),
        confidence: result.confidence,
        assessment,
        probabilities,
    }
}

/// Writes one bar per class, most likely first, marking `predicted_index`.
pub fn display_probabilities<W: Write>(
    out: &mut W,
    class_names: &[String],
    probabilities: &[f32],
    predicted_index: usize,
) -> fmt::Result {
    let mut rows: Vec<(usize, &str, f32)> = class_names
        .iter()
        .zip(probabilities)
        .enumerate()
        .map(|(i, (label, &p))| (i, label.as_str(), p))
        .collect();
    rows.sort_by(|a, b| b.2.total_cmp(&a.2));
    write_bars(
        out,
        rows.into_iter()
            .map(|(i, label, p)| (label, p, i == predicted_index)),
    )
}

fn write_bars<'a, W, I>(out: &mut W, rows: I) -> fmt::Result
where
    W: Write,
    I: IntoIterator<Item = (&'a str, f32, bool)>,
{
    let rows: Vec<_> = rows.into_iter().collect();
    let width = rows.iter().map(|(label, _, _)| label.chars().count()).max().unwrap_or(0);

    writeln!(out, "Probabilities by class:")?;
    for (label, probability, predicted) in rows {
        let filled = ((probability.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
        let marker = if predicted { '>' } else { ' ' };
        writeln!(
            out,
            "{marker} {label:<width$}  [{}{}] {:>6.2}%",
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            probability * 100.0,
        )?;
    }
    Ok(())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.assessment {
            Assessment::Reliable { record } => {
                writeln!(f, "Diagnosis: {}", self.label)?;
                writeln!(f, "Confidence: {:.2}%", self.confidence * 100.0)?;
                writeln!(f)?;
                writeln!(f, "Description: {}", record.description)?;
                writeln!(f, "Typical symptoms: {}", record.symptoms)?;
                writeln!(f, "General treatment: {}", record.treatment)?;
                writeln!(f, "Severity: {}", record.severity)?;
            }
            Assessment::Uncertain { threshold } => {
                writeln!(f, "Uncertain prediction")?;
                writeln!(f, "Possible diagnosis: {}", self.label)?;
                writeln!(
                    f,
                    "Confidence: {:.2}% (below the {:.0}% threshold)",
                    self.confidence * 100.0,
                    threshold * 100.0
                )?;
                writeln!(f, "The image is not clear enough for a reliable diagnosis.")?;
                writeln!(f, "Try again with a clearer image or consult a doctor.")?;
            }
        }

        writeln!(f)?;
        write_bars(
            f,
            self.probabilities
                .iter()
                .map(|p| (p.label.as_str(), p.probability, p.predicted)),
        )?;
        writeln!(f)?;
        f.write_str(RECOMMENDATIONS)
    }
}
