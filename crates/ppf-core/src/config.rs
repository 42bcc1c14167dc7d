//! Engine configuration.
//!
//! One immutable [`WorkflowConfig`] is built per [`crate::Workflow`] and
//! shared by the sequencer, the draft store, the photo pipeline and the
//! aggregator.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::StepCatalog,
    error::{Result, WorkflowError},
    models::DefectSeverity,
};

/// Capture and image preparation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureSettings {
    /// Longest edge in pixels after downscaling
    pub max_edge: u32,
    /// JPEG quality used when re-encoding, 1 to 100
    pub jpeg_quality: u8,
    /// Minimum frame score enabling the capture control
    pub min_frame_score: f64,
    /// Period of the live-frame quality check
    pub validation_interval_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_edge: 1920,
            jpeg_quality: 80,
            min_frame_score: 60.0,
            validation_interval_ms: 1000,
        }
    }
}

impl CaptureSettings {
    pub fn validation_interval(&self) -> Duration {
        Duration::from_millis(self.validation_interval_ms)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub catalog: StepCatalog,
    /// Aggregated quality score below which a supervisor must approve
    pub acceptance_threshold: f64,
    /// Unresolved defects at or above this severity require approval
    pub approval_severity: DefectSeverity,
    pub capture: CaptureSettings,
    pub geolocation_timeout_ms: u64,
    /// Upper bound of uploads running at the same time
    pub max_concurrent_uploads: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            catalog: StepCatalog::default(),
            acceptance_threshold: 70.0,
            approval_severity: DefectSeverity::High,
            capture: CaptureSettings::default(),
            geolocation_timeout_ms: 5000,
            max_concurrent_uploads: 3,
        }
    }
}

impl WorkflowConfig {
    /// Reads and validates a JSON configuration file. Missing keys take
    /// their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| WorkflowError::FileSystem {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| WorkflowError::Configuration {
            message: format!("Invalid configuration file {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.catalog.validate()?;
        if !(0.0..=100.0).contains(&self.acceptance_threshold) {
            return Err(WorkflowError::Configuration {
                message: "acceptance_threshold must be between 0 and 100".into(),
            });
        }
        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            return Err(WorkflowError::Configuration {
                message: "capture.jpeg_quality must be between 1 and 100".into(),
            });
        }
        if self.capture.max_edge == 0 {
            return Err(WorkflowError::Configuration {
                message: "capture.max_edge must be positive".into(),
            });
        }
        if self.max_concurrent_uploads == 0 {
            return Err(WorkflowError::Configuration {
                message: "max_concurrent_uploads must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }
}
