//! Defects reported during a step.

use std::{fmt, str::FromStr};

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Severity scale for film defects. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum DefectSeverity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl DefectSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectSeverity::Low => "low",
            DefectSeverity::Medium => "medium",
            DefectSeverity::High => "high",
            DefectSeverity::Critical => "critical",
        }
    }
}

impl FromStr for DefectSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(DefectSeverity::Low),
            "medium" => Ok(DefectSeverity::Medium),
            "high" => Ok(DefectSeverity::High),
            "critical" => Ok(DefectSeverity::Critical),
            _ => Err(format!("Invalid defect severity: {s}")),
        }
    }
}

impl fmt::Display for DefectSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A defect entry inside a step's `collected_data.defects` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Defect {
    /// Defect category, e.g. `bubble`, `lifted_edge`, `contamination`
    #[serde(alias = "type")]
    pub kind: String,

    #[serde(default)]
    pub severity: DefectSeverity,

    /// Panel or zone of the vehicle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Fixed on site
    #[serde(default)]
    pub resolved: bool,

    /// Left as-is with the customer's or supervisor's consent
    #[serde(default)]
    pub accepted: bool,
}

impl Defect {
    /// A defect blocks completion until it is either fixed or accepted.
    pub fn is_settled(&self) -> bool {
        self.resolved || self.accepted
    }
}
