//! Error types for the intervention workflow engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::StepType;

/// Message surfaced when a photo capture is attempted without connectivity.
pub const OFFLINE_UPLOAD_MESSAGE: &str = "Upload photo indisponible hors ligne";

/// Comprehensive error type for all workflow operations.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// An earlier mandatory step is not completed yet
    #[error("Cannot access step '{step}': mandatory step(s) {} must be completed first", join_steps(.missing))]
    PrerequisiteNotMet {
        step: StepType,
        missing: Vec<StepType>,
    },
    /// Not enough photos attached to a step that requires them
    #[error("Step '{step}' requires at least {required} photo(s), {actual} provided")]
    PhotoRequirementNotMet {
        step: StepType,
        required: u32,
        actual: u32,
    },
    /// More photos than the catalog allows for the step
    #[error("Step '{step}' accepts at most {allowed} photo(s), {actual} provided")]
    PhotoLimitExceeded {
        step: StepType,
        allowed: u32,
        actual: u32,
    },
    /// A step-specific completion rule failed
    #[error("Step '{step}' cannot be completed: {reason}")]
    StepValidationFailed { step: StepType, reason: String },
    /// The caller identity is missing or no longer valid
    #[error("Session expired, please sign in again")]
    SessionExpired,
    /// Intervention not found for the given ID
    #[error("Intervention with ID {id} not found")]
    InterventionNotFound { id: u64 },
    /// Step record missing for an intervention
    #[error("Step '{step}' not found for intervention {intervention_id}")]
    StepNotFound {
        intervention_id: u64,
        step: StepType,
    },
    /// Status change not permitted by the step state machine
    #[error("Invalid transition for step '{step}': {reason}")]
    InvalidTransition { step: StepType, reason: String },
    /// Intervention already finalized, no reopening
    #[error("Intervention {id} is already finalized")]
    AlreadyFinalized { id: u64 },
    /// Finalization attempted with an incomplete mandatory step
    #[error("Cannot finalize intervention {intervention_id}: mandatory step(s) {} incomplete", join_steps(.missing))]
    FinalizationPrerequisiteNotMet {
        intervention_id: u64,
        missing: Vec<StepType>,
    },
    /// A completed step lacks data its schema requires
    #[error("Step '{step}' is completed but inconsistent: {reason}")]
    AggregationDataInconsistent { step: StepType, reason: String },
    /// Photo storage rejected or failed the upload
    #[error("Photo upload failed: {message}")]
    UploadFailed { message: String },
    /// Photo capture requested while offline
    #[error("{}", OFFLINE_UPLOAD_MESSAGE)]
    OfflineUploadUnavailable,
    /// Unknown upload item
    #[error("Upload item {id} not found")]
    UploadNotFound { id: u64 },
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Image decoding or encoding errors
    #[error("Image processing error: {source}")]
    Image {
        #[from]
        source: image::ImageError,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

fn join_steps(steps: &[StepType]) -> String {
    steps
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> WorkflowError {
        WorkflowError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> WorkflowError {
        WorkflowError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl WorkflowError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Wraps a blocking task join failure.
    pub(crate) fn join(e: tokio::task::JoinError) -> Self {
        Self::Configuration {
            message: format!("Task join error: {e}"),
        }
    }

    /// True for errors that indicate corrupted or unexpected state rather
    /// than a user-recoverable condition.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            Self::StepNotFound { .. }
                | Self::AggregationDataInconsistent { .. }
                | Self::Database { .. }
                | Self::FileSystem { .. }
                | Self::Serialization { .. }
        )
    }

    /// True when the user can resolve the error by completing work, capturing
    /// photos or retrying an upload.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PrerequisiteNotMet { .. }
                | Self::PhotoRequirementNotMet { .. }
                | Self::PhotoLimitExceeded { .. }
                | Self::StepValidationFailed { .. }
                | Self::UploadFailed { .. }
                | Self::OfflineUploadUnavailable
        )
    }

    /// True for integrity errors and for every failure reported with the
    /// `internal` code.
    pub fn is_internal(&self) -> bool {
        self.is_integrity_error() || self.code() == "internal"
    }

    /// Message safe to show to a technician. Internal errors collapse to a
    /// generic text so storage and runtime details never reach the UI.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "An unexpected error occurred. The incident has been logged.".to_string()
        } else {
            self.to_string()
        }
    }

    /// Stable machine-readable code used by the boundary responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PrerequisiteNotMet { .. } => "prerequisite_not_met",
            Self::PhotoRequirementNotMet { .. } => "photo_requirement_not_met",
            Self::PhotoLimitExceeded { .. } => "photo_limit_exceeded",
            Self::StepValidationFailed { .. } => "step_validation_failed",
            Self::SessionExpired => "session_expired",
            Self::InterventionNotFound { .. } => "intervention_not_found",
            Self::StepNotFound { .. } => "step_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::AlreadyFinalized { .. } => "already_finalized",
            Self::FinalizationPrerequisiteNotMet { .. } => "finalization_prerequisite_not_met",
            Self::AggregationDataInconsistent { .. } => "aggregation_data_inconsistent",
            Self::UploadFailed { .. } => "upload_failed",
            Self::OfflineUploadUnavailable => "offline_upload_unavailable",
            Self::UploadNotFound { .. } => "upload_not_found",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Database { .. }
            | Self::FileSystem { .. }
            | Self::XdgDirectory(_)
            | Self::Serialization { .. }
            | Self::Image { .. }
            | Self::Configuration { .. } => "internal",
        }
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| WorkflowError::database(message).with_source(e))
    }
}

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;
