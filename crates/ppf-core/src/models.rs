//! Domain models of the intervention workflow.
//!
//! Models implement [`std::fmt::Display`] as markdown (see
//! [`crate::display`]) so the CLI and the MCP boundary format them the same
//! way.

pub mod defect;
pub mod intervention;
pub mod photo;
pub mod status;
pub mod step;

pub use defect::{Defect, DefectSeverity};
pub use intervention::{progress_percentage, Intervention, InterventionProgress};
pub use photo::{CameraSnapshot, GeoLocation, PhotoMetadata, PhotoTags, StepPhoto, UploadItem};
pub use status::{InterventionStatus, StepStatus, UploadStatus};
pub use step::{checklist_entries, defect_entries, StepRecord, StepType};
