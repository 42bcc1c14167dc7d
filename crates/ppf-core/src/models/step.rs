//! Step types and the per-intervention step record.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Defect, StepStatus};

/// Phase of a PPF intervention. Declaration order is the fixed catalog order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Inspection,
    Preparation,
    Installation,
    QualityControl,
    Finalization,
}

impl StepType {
    /// Every step type in catalog order.
    pub const ALL: [StepType; 5] = [
        StepType::Inspection,
        StepType::Preparation,
        StepType::Installation,
        StepType::QualityControl,
        StepType::Finalization,
    ];

    /// Zero-based position in the fixed ordering.
    pub fn position(&self) -> usize {
        match self {
            StepType::Inspection => 0,
            StepType::Preparation => 1,
            StepType::Installation => 2,
            StepType::QualityControl => 3,
            StepType::Finalization => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Inspection => "inspection",
            StepType::Preparation => "preparation",
            StepType::Installation => "installation",
            StepType::QualityControl => "quality_control",
            StepType::Finalization => "finalization",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            StepType::Inspection => "Inspection",
            StepType::Preparation => "Preparation",
            StepType::Installation => "Installation",
            StepType::QualityControl => "Quality control",
            StepType::Finalization => "Finalization",
        }
    }
}

impl FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "inspection" => Ok(StepType::Inspection),
            "preparation" => Ok(StepType::Preparation),
            "installation" => Ok(StepType::Installation),
            "quality_control" | "qc" => Ok(StepType::QualityControl),
            "finalization" => Ok(StepType::Finalization),
            _ => Err(format!("Invalid step type: {s}")),
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of one intervention, provisioned from the catalog when the
/// intervention starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRecord {
    /// Unique identifier for the step record
    pub id: u64,

    /// ID of the parent intervention
    pub intervention_id: u64,

    pub step_type: StepType,

    /// Position within the intervention's catalog (0-indexed)
    pub order: u32,

    pub status: StepStatus,

    pub is_mandatory: bool,

    pub requires_photos: bool,

    pub min_photos_required: u32,

    pub max_photos_allowed: u32,

    /// Free-form payload entered by the technician
    #[serde(default)]
    pub collected_data: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Uploaded photo URLs in capture order; `None` until the first photo
    pub photo_urls: Option<Vec<String>>,

    /// Score between 0 and 100
    pub quality_score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_check_passed: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,

    pub requires_supervisor_approval: bool,

    pub approved_by: Option<String>,

    pub approved_at: Option<Timestamp>,

    /// Number of durable writes applied to this record
    pub revision: u32,

    pub started_at: Option<Timestamp>,

    pub completed_at: Option<Timestamp>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

impl StepRecord {
    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Number of photos attached so far.
    pub fn photo_count(&self) -> u32 {
        self.photo_urls.as_ref().map_or(0, |urls| urls.len() as u32)
    }

    /// Checklist entries from `collected_data.checklist`; a null answer
    /// means the item was not answered.
    pub fn checklist(&self) -> Vec<(&str, &Value)> {
        checklist_entries(&self.collected_data)
    }

    /// Defects recorded in `collected_data.defects`.
    pub fn defects(&self) -> Result<Vec<Defect>, serde_json::Error> {
        defect_entries(&self.collected_data)
    }
}

/// Reads the `checklist` object of a step payload. Answers are kept as given:
/// any non-null value counts as answered, only `true` as checked.
pub fn checklist_entries(data: &Value) -> Vec<(&str, &Value)> {
    data.get("checklist")
        .and_then(Value::as_object)
        .map(|items| {
            items
                .iter()
                .map(|(name, answer)| (name.as_str(), answer))
                .collect()
        })
        .unwrap_or_default()
}

/// Reads the `defects` array of a step payload.
pub fn defect_entries(data: &Value) -> Result<Vec<Defect>, serde_json::Error> {
    match data.get("defects") {
        Some(value) if !value.is_null() => serde_json::from_value(value.clone()),
        _ => Ok(Vec::new()),
    }
}
