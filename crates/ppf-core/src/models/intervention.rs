//! Intervention aggregate root.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{InterventionStatus, StepRecord};
use crate::aggregator::CompletionMetrics;

/// One PPF service job against a task/vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intervention {
    /// Unique identifier for the intervention
    pub id: u64,

    /// Reference of the task (vehicle job) this intervention fulfils
    pub task_ref: String,

    pub status: InterventionStatus,

    /// Technician who started the intervention
    pub technician_id: String,

    /// Share of completed steps, 0 to 100
    pub progress_percentage: f64,

    pub requires_supervisor_approval: bool,

    /// Summary stored at finalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CompletionMetrics>,

    pub started_at: Option<Timestamp>,

    pub finalized_at: Option<Timestamp>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,

    /// Associated steps (lazy-loaded by default)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub steps: Vec<StepRecord>,
}

impl Intervention {
    pub fn is_finalized(&self) -> bool {
        self.status == InterventionStatus::Completed
    }
}

/// Steps plus the derived progress of one intervention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterventionProgress {
    pub intervention_id: u64,
    pub status: InterventionStatus,
    pub steps: Vec<StepRecord>,
    pub progress_percentage: f64,
}

/// Percentage of completed steps, rounded to one decimal.
pub fn progress_percentage(steps: &[StepRecord]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    let completed = steps.iter().filter(|s| s.is_completed()).count() as f64;
    (completed * 1000.0 / steps.len() as f64).round() / 10.0
}
