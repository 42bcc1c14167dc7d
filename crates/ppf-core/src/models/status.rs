//! Status enumerations for interventions, steps and uploads.

use std::{fmt, str::FromStr};

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single step record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step has not been touched yet
    #[default]
    Pending,

    /// Technician is working on the step
    InProgress,

    /// Step validated and completed
    Completed,
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(StepStatus::Pending),
            "in_progress" | "inprogress" => Ok(StepStatus::InProgress),
            "completed" => Ok(StepStatus::Completed),
            _ => Err(format!("Invalid step status: {s}")),
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StepStatus {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
        }
    }

    /// Status with a leading icon, used by list displays.
    ///
    /// ```rust
    /// use ppf_core::models::StepStatus;
    ///
    /// assert_eq!(StepStatus::Completed.with_icon(), "✓ Completed");
    /// assert_eq!(StepStatus::InProgress.with_icon(), "➤ In Progress");
    /// assert_eq!(StepStatus::Pending.with_icon(), "○ Pending");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            StepStatus::Completed => "✓ Completed",
            StepStatus::InProgress => "➤ In Progress",
            StepStatus::Pending => "○ Pending",
        }
    }
}

/// Workflow status of the intervention aggregate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum InterventionStatus {
    #[default]
    NotStarted,
    InProgress,
    /// Terminal and irreversible
    Completed,
}

impl FromStr for InterventionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" => Ok(InterventionStatus::NotStarted),
            "in_progress" => Ok(InterventionStatus::InProgress),
            "completed" => Ok(InterventionStatus::Completed),
            _ => Err(format!("Invalid intervention status: {s}")),
        }
    }
}

impl fmt::Display for InterventionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InterventionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionStatus::NotStarted => "not_started",
            InterventionStatus::InProgress => "in_progress",
            InterventionStatus::Completed => "completed",
        }
    }
}

/// Delivery state of a queued photo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Queued,
    Uploading,
    Completed,
    Error,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadStatus::Queued => "queued",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Error => "error",
        })
    }
}
