//! Core library for the PPF intervention workflow.
//!
//! A paint-protection-film intervention walks a technician through an ordered
//! catalog of steps (inspection, preparation, installation, quality control,
//! finalization). This crate owns the rules of that walk:
//!
//! - **Catalog** ([`catalog`]): step definitions, order and photo rules
//! - **Sequencer** ([`sequencer`]): step gating and completion validation
//! - **Drafts** ([`draft`]): deduplicated autosave of in-progress step data
//! - **Photos** ([`photo`]): capture, preparation, quality gate and upload queue
//! - **Aggregator** ([`aggregator`]): completion metrics and approval flags
//! - **Workflow** ([`workflow`]): the async facade tying these to the store
//!
//! Every outcome can cross a process boundary as JSON through [`boundary`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ppf_core::{params::StartIntervention, Session, WorkflowBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = WorkflowBuilder::new()
//!     .with_database_path(Some("ppf.db"))
//!     .build()
//!     .await?;
//!
//! let session = Session::new("tech-42");
//! let intervention = workflow
//!     .start_intervention(&session, &StartIntervention { task_ref: "TASK-1".into() })
//!     .await?;
//! println!("{intervention}");
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod boundary;
pub mod catalog;
pub mod config;
pub mod db;
pub mod display;
pub mod draft;
pub mod error;
pub mod models;
pub mod params;
pub mod photo;
pub mod sequencer;
pub mod session;
pub mod workflow;

// Re-export commonly used types
pub use aggregator::{Aggregator, ApprovalReason, CompletionMetrics};
pub use boundary::{Command, ErrorBody, Request, Response};
pub use catalog::{StepCatalog, StepDefinition};
pub use config::{CaptureSettings, WorkflowConfig};
pub use db::Database;
pub use display::{Interventions, LocalDateTime, OperationStatus, Photos, Steps, Uploads};
pub use error::{Result, WorkflowError};
pub use models::{
    Defect, DefectSeverity, Intervention, InterventionProgress, InterventionStatus, StepPhoto, StepRecord,
    StepStatus, StepType, UploadItem, UploadStatus,
};
pub use sequencer::Sequencer;
pub use session::Session;
pub use workflow::{DraftSaved, Finalized, PhotoAttached, StepAdvanced, Workflow, WorkflowBuilder};
