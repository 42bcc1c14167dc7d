//! Photo evidence and upload tracking models.

use std::path::PathBuf;

use jiff::Timestamp;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{StepType, UploadStatus};

/// Best-effort device position at capture time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Altitude in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

/// Camera configuration captured alongside a photo when obtainable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CameraSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// `front` or `back`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<bool>,
}

/// Tags sent to the storage service with each photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoTags {
    pub intervention_id: u64,
    pub step_type: StepType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Metadata persisted for every delivered photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoMetadata {
    pub captured_at: Timestamp,
    pub tags: PhotoTags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraSnapshot>,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
}

/// A stored photo row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepPhoto {
    pub id: u64,
    pub step_id: u64,
    pub url: String,
    pub metadata: PhotoMetadata,
}

/// Tracked unit of in-flight photo delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadItem {
    pub id: u64,
    /// Source file of the capture
    pub source: PathBuf,
    pub intervention_id: u64,
    pub step_type: StepType,
    pub status: UploadStatus,
    /// 0 to 100
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: Timestamp,
}
