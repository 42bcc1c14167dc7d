//! Parameter structures for workflow operations.
//!
//! These are the payloads shared by every interface (boundary commands, CLI,
//! MCP tools). They derive `serde` so the boundary codec can decode them
//! directly, and `JsonSchema` when the `schema` feature is enabled.

use std::path::PathBuf;

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{CameraSnapshot, InterventionStatus, StepType};

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Starts a new intervention against a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct StartIntervention {
    /// Reference of the task or vehicle job
    pub task_ref: String,
}

/// Identifies an intervention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct InterventionRef {
    pub intervention_id: u64,
}

/// Identifies one step of an intervention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct StepRef {
    pub intervention_id: u64,
    pub step_type: StepType,
}

/// Filters for listing interventions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ListInterventions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InterventionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_ref: Option<String>,
}

/// Autosave of partially entered step data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct SaveDraft {
    pub intervention_id: u64,
    pub step_type: StepType,
    #[serde(default = "empty_object")]
    pub collected_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Replaces the step's photo list when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
    /// Refresh cached progress views after the write
    #[serde(default)]
    pub invalidate: bool,
}

/// Completes a step and moves the workflow forward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct AdvanceStep {
    pub intervention_id: u64,
    pub step_type: StepType,
    #[serde(default = "empty_object")]
    pub collected_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Final photo list; the photos attached so far are kept when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
    /// Step quality score, 0 to 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_check_passed: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Completes the terminal step and closes the intervention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct FinalizeIntervention {
    pub intervention_id: u64,
    /// Data collected on the terminal step
    #[serde(default = "empty_object")]
    pub finalization_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

/// Captures and delivers a photo for a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CapturePhoto {
    pub intervention_id: u64,
    pub step_type: StepType,
    /// Image file produced by the camera
    pub source: PathBuf,
    /// Shooting angle, e.g. `front_left`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<String>,
    /// Evidence category, e.g. `damage` or `result`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraSnapshot>,
}

/// Identifies a tracked upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct UploadRef {
    pub upload_id: u64,
}

impl From<&AdvanceStep> for FinalizeIntervention {
    fn from(params: &AdvanceStep) -> Self {
        Self {
            intervention_id: params.intervention_id,
            finalization_data: params.collected_data.clone(),
            notes: params.notes.clone(),
            photos: params.photos.clone(),
            quality_score: params.quality_score,
        }
    }
}

impl AdvanceStep {
    /// Advance with only the step data, as the UI sends for simple steps.
    pub fn new(intervention_id: u64, step_type: StepType, collected_data: Value) -> Self {
        Self {
            intervention_id,
            step_type,
            collected_data,
            notes: None,
            photos: None,
            quality_score: None,
            quality_check_passed: None,
            issues: Vec::new(),
        }
    }
}

impl SaveDraft {
    pub fn new(intervention_id: u64, step_type: StepType, collected_data: Value) -> Self {
        Self {
            intervention_id,
            step_type,
            collected_data,
            notes: None,
            photos: None,
            invalidate: false,
        }
    }
}
