//! Static educational text about each condition the classifier knows.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Conditions the classifier was trained on, in training order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disease {
    Acne,
    Chickenpox,
    Measles,
    Monkeypox,
}

impl Disease {
    pub const ALL: [Disease; 4] = [
        Disease::Acne,
        Disease::Chickenpox,
        Disease::Measles,
        Disease::Monkeypox,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Disease::Acne => "Acne",
            Disease::Chickenpox => "Chickenpox",
            Disease::Measles => "Measles",
            Disease::Monkeypox => "Monkeypox",
        }
    }

    pub fn record(self) -> &'static DiseaseRecord {
        match self {
            Disease::Acne => &ACNE,
            Disease::Chickenpox => &CHICKENPOX,
            Disease::Measles => &MEASLES,
            Disease::Monkeypox => &MONKEYPOX,
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Disease {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Disease::ALL
            .into_iter()
            .find(|disease| disease.label() == s)
            .ok_or(())
    }
}

/// Label order used when a checkpoint carries no class names.
pub fn default_class_names() -> Vec<String> {
    Disease::ALL.iter().map(|d| d.label().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiseaseRecord {
    pub description: &'static str,
    pub symptoms: &'static str,
    pub treatment: &'static str,
    pub severity: &'static str,
}

const ACNE: DiseaseRecord = DiseaseRecord {
    description: "Acne is a common skin condition caused by clogged hair follicles.",
    symptoms: "Blackheads, red pimples, cysts",
    treatment: "Regular cleansing, topical creams, antibiotics in some cases",
    severity: "Usually benign",
};

const CHICKENPOX: DiseaseRecord = DiseaseRecord {
    description: "Chickenpox is a highly contagious viral infection caused by the varicella-zoster virus.",
    symptoms: "Itchy blister-like rash, fever, fatigue",
    treatment: "Rest, antihistamines for itching, antivirals in some cases",
    severity: "Moderate - Contagious",
};

const MEASLES: DiseaseRecord = DiseaseRecord {
    description: "Measles is a highly contagious viral infection that mainly affects children.",
    symptoms: "Skin rash, high fever, cough, conjunctivitis",
    treatment: "Rest, hydration, vitamin A, preventive vaccination",
    severity: "Serious - Highly contagious",
};

const MONKEYPOX: DiseaseRecord = DiseaseRecord {
    description: "Monkeypox (Mpox) is a rare viral disease transmitted to humans from animals.",
    symptoms: "Pustule-like skin rash, fever, swollen lymph nodes",
    treatment: "Supportive care, isolation, antivirals in some cases",
    severity: "Moderate to serious - Requires medical monitoring",
};

/// Returned for any label outside the curated set.
pub const UNKNOWN_DISEASE: DiseaseRecord = DiseaseRecord {
    description: "Information not available",
    symptoms: "N/A",
    treatment: "Consult a healthcare professional",
    severity: "N/A",
};

/// Looks up the curated record for `label`.
///
/// Never fails: empty strings, typos and labels from a differently trained
/// model all resolve to [`UNKNOWN_DISEASE`]. Matching is exact and
/// case-sensitive.
pub fn get_disease_info(label: &str) -> &'static DiseaseRecord {
    match label.parse::<Disease>() {
        Ok(disease) => disease.record(),
        Err(()) => &UNKNOWN_DISEASE,
    }
}
