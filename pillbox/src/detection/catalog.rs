//! Known-product catalog and identification results
//!
//! Detector labels are matched against a short keyword table. When nothing
//! matches, the demo entry is shown instead, and the result says so.

use crate::config::HIGH_CONFIDENCE_THRESHOLD;
use crate::detection::Detection;
use crate::store::{MedicineCategory, NewMedicine};
use serde::Serialize;

/// Fixed description of a recognizable product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Lowercase keywords searched for inside detector labels
    pub keywords: &'static [&'static str],
    pub name: &'static str,
    pub category: MedicineCategory,
    pub manufacturer: &'static str,
    pub main_ingredient: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    fn matches(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.keywords.iter().any(|k| label.contains(k))
    }
}

/// First entry doubles as the demo entry
pub static CATALOG: [CatalogEntry; 5] = [
    CatalogEntry {
        keywords: &["tylenol", "타이레놀"],
        name: "Tylenol 500mg",
        category: MedicineCategory::Medicine,
        manufacturer: "Janssen Korea",
        main_ingredient: "Acetaminophen",
        description: "Analgesic and antipyretic",
    },
    CatalogEntry {
        keywords: &["centrum", "센트룸", "센트롬"],
        name: "Centrum Multivitamin",
        category: MedicineCategory::Supplement,
        manufacturer: "Haleon",
        main_ingredient: "Multivitamins and minerals",
        description: "Daily multivitamin supplement",
    },
    CatalogEntry {
        keywords: &["advil", "애드빌"],
        name: "Advil 200mg",
        category: MedicineCategory::Medicine,
        manufacturer: "Haleon",
        main_ingredient: "Ibuprofen",
        description: "Anti-inflammatory pain reliever",
    },
    CatalogEntry {
        keywords: &["fucidin", "후시딘"],
        name: "Fucidin Ointment",
        category: MedicineCategory::ExternalUse,
        manufacturer: "Dongwha Pharm",
        main_ingredient: "Fusidic acid",
        description: "Topical antibiotic for skin infections",
    },
    CatalogEntry {
        keywords: &["bearse", "베아제"],
        name: "Bearse",
        category: MedicineCategory::Medicine,
        manufacturer: "Daewoong Pharmaceutical",
        main_ingredient: "Pancreatin, simethicone",
        description: "Digestive aid",
    },
];

/// Entry shown when nothing could be identified
pub fn demo_entry() -> &'static CatalogEntry {
    &CATALOG[0]
}

/// Find the catalog entry whose keyword appears in `label`
pub fn lookup(label: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.matches(label))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No detection survived filtering
    NoDetections,
    /// Best detection's label matched no keyword
    UnknownLabel,
    /// The detector returned an error
    DetectorFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum IdentificationOutcome {
    Matched,
    Fallback(FallbackReason),
}

/// What the result screen shows for one analysed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    pub entry: &'static CatalogEntry,
    /// Label of the best detection, if there was one
    pub label: Option<String>,
    pub confidence: f32,
    pub outcome: IdentificationOutcome,
}

impl Identification {
    pub fn fallback(reason: FallbackReason) -> Self {
        Self {
            entry: demo_entry(),
            label: None,
            confidence: 0.0,
            outcome: IdentificationOutcome::Fallback(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, IdentificationOutcome::Fallback(_))
    }

    /// Below this a retake should be suggested
    pub fn is_high_confidence(&self) -> bool {
        !self.is_fallback() && self.confidence > HIGH_CONFIDENCE_THRESHOLD
    }

    /// Request for adding the identified product to the user's list
    pub fn to_new_medicine(&self, image_uri: Option<String>) -> NewMedicine {
        NewMedicine {
            name: self.entry.name.to_string(),
            category: self.entry.category,
            manufacturer: self.entry.manufacturer.to_string(),
            main_ingredient: self.entry.main_ingredient.to_string(),
            description: self.entry.description.to_string(),
            image_uri,
            active: true,
        }
    }
}

/// Pick the most confident detection and map it onto the catalog
pub fn identify(detections: &[Detection]) -> Identification {
    let Some(best) = detections
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    else {
        return Identification::fallback(FallbackReason::NoDetections);
    };

    match lookup(&best.label) {
        Some(entry) => {
            tracing::info!("Identified '{}' as {} ({:.2})", best.label, entry.name, best.confidence);
            Identification {
                entry,
                label: Some(best.label.clone()),
                confidence: best.confidence,
                outcome: IdentificationOutcome::Matched,
            }
        }
        None => {
            tracing::info!("No catalog entry for label '{}'", best.label);
            Identification {
                label: Some(best.label.clone()),
                confidence: best.confidence,
                ..Identification::fallback(FallbackReason::UnknownLabel)
            }
        }
    }
}
