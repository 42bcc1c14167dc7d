//! Processing boundary codec.
//!
//! A request carries the caller identity plus one closed [`Command`], tagged
//! by `action` with its `payload`:
//!
//! ```json
//! {
//!   "caller": {"user_id": "tech-42"},
//!   "action": "save_draft",
//!   "payload": {"intervention_id": 1, "step_type": "installation", "collected_data": {}}
//! }
//! ```
//!
//! Requests are decoded once here; the engine only ever sees typed
//! parameters. Every outcome, failures included, maps to one [`Response`]
//! variant.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::WorkflowError,
    models::{Intervention, InterventionProgress, StepPhoto, StepRecord, StepType, UploadItem},
    params::{
        AdvanceStep, CapturePhoto, FinalizeIntervention, InterventionRef, ListInterventions, SaveDraft,
        StartIntervention, StepRef, UploadRef,
    },
    session::Session,
    workflow::{DraftSaved, Finalized, PhotoAttached, StepAdvanced},
};

/// One call across the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Request {
    pub caller: Session,
    #[serde(flatten)]
    pub command: Command,
}

/// Every operation the presentation layer may invoke.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum Command {
    StartIntervention(StartIntervention),
    GetIntervention(InterventionRef),
    ListInterventions(ListInterventions),
    Progress(InterventionRef),
    CurrentStep(InterventionRef),
    CanAccessStep(StepRef),
    BeginStep(StepRef),
    SaveDraft(SaveDraft),
    AdvanceStep(AdvanceStep),
    ApproveStep(StepRef),
    Finalize(FinalizeIntervention),
    CapturePhoto(CapturePhoto),
    RetryUpload(UploadRef),
    AcknowledgeUpload(UploadRef),
    ListUploads,
    StepPhotos(StepRef),
}

impl Command {
    /// The `action` tag of the command.
    pub fn action(&self) -> &'static str {
        match self {
            Self::StartIntervention(_) => "start_intervention",
            Self::GetIntervention(_) => "get_intervention",
            Self::ListInterventions(_) => "list_interventions",
            Self::Progress(_) => "progress",
            Self::CurrentStep(_) => "current_step",
            Self::CanAccessStep(_) => "can_access_step",
            Self::BeginStep(_) => "begin_step",
            Self::SaveDraft(_) => "save_draft",
            Self::AdvanceStep(_) => "advance_step",
            Self::ApproveStep(_) => "approve_step",
            Self::Finalize(_) => "finalize",
            Self::CapturePhoto(_) => "capture_photo",
            Self::RetryUpload(_) => "retry_upload",
            Self::AcknowledgeUpload(_) => "acknowledge_upload",
            Self::ListUploads => "list_uploads",
            Self::StepPhotos(_) => "step_photos",
        }
    }
}

/// Typed failure returned across the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub code: String,
    /// Message safe to show to the technician
    pub message: String,
    /// Whether the technician can fix the cause and try again
    pub recoverable: bool,
}

impl From<&WorkflowError> for ErrorBody {
    fn from(error: &WorkflowError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.public_message(),
            recoverable: error.is_recoverable(),
        }
    }
}

/// Outcome of a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Response {
    Intervention(Intervention),
    Interventions(Vec<Intervention>),
    Progress(InterventionProgress),
    CurrentStep { step: Option<StepType> },
    Access { step: StepType, allowed: bool },
    Step(StepRecord),
    DraftSaved(DraftSaved),
    StepAdvanced(StepAdvanced),
    Finalized(Finalized),
    PhotoAttached(PhotoAttached),
    Upload(UploadItem),
    Uploads(Vec<UploadItem>),
    Photos(Vec<StepPhoto>),
    Error(ErrorBody),
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Failure for a request that could not be decoded.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::Error(ErrorBody {
            code: "invalid_request".to_string(),
            message: reason.into(),
            recoverable: false,
        })
    }
}

impl From<&WorkflowError> for Response {
    fn from(error: &WorkflowError) -> Self {
        Self::Error(error.into())
    }
}
