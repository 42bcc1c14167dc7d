//! High-level engine API.
//!
//! [`Workflow`] is the single entry point of the presentation layer. It ties
//! the step catalog, the [`Sequencer`](crate::sequencer::Sequencer), the draft
//! store, the photo pipeline and the
//! [`Aggregator`](crate::aggregator::Aggregator) to the SQLite store.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │    Boundary     │    │    Workflow     │    │    Database     │
//! │ (Request,       │───▶│ (sequencer,     │───▶│   (via db/)     │
//! │  dispatch)      │    │  drafts, photos)│    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! Every call takes the caller's [`Session`](crate::session::Session)
//! explicitly. Storage work runs on the blocking pool with a connection per
//! call; mutations are single transactions.
//!
//! # Example
//!
//! ```rust,no_run
//! use ppf_core::{params::{SaveDraft, StartIntervention}, Session, StepType, WorkflowBuilder};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = WorkflowBuilder::new()
//!     .with_database_path(Some("ppf.db"))
//!     .build()
//!     .await?;
//! let session = Session::new("tech-42");
//!
//! let intervention = workflow
//!     .start_intervention(&session, &StartIntervention { task_ref: "TASK-1".into() })
//!     .await?;
//! let resume_at = workflow.current_step(&session, intervention.id).await?;
//! assert_eq!(resume_at, Some(StepType::Inspection));
//!
//! workflow
//!     .save_draft(
//!         &session,
//!         &SaveDraft::new(intervention.id, StepType::Inspection, json!({"checklist": {"hood": true}})),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, task};

use crate::{
    aggregator::CompletionMetrics,
    config::WorkflowConfig,
    db::Database,
    draft::DraftSignatures,
    error::{Result, WorkflowError},
    models::{Intervention, InterventionProgress, StepPhoto, StepRecord, StepType, UploadItem},
    photo::PhotoPipeline,
};

pub mod builder;
pub mod dispatch;
pub mod draft_ops;
pub mod finalize_ops;
pub mod intervention_ops;
pub mod photo_ops;
pub mod step_ops;

pub use builder::WorkflowBuilder;

/// Result of a draft save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftSaved {
    pub step: StepRecord,
    /// False when the payload matched the last saved signature and nothing
    /// was written
    pub written: bool,
}

/// Result of completing a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepAdvanced {
    pub step: StepRecord,
    /// Where the technician continues, `None` once every step is completed
    pub next_step: Option<StepType>,
    pub progress_percentage: f64,
    /// Present when the advanced step was the terminal one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CompletionMetrics>,
}

/// Result of finalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finalized {
    pub intervention: Intervention,
    pub metrics: CompletionMetrics,
}

/// A photo delivered and attached to its step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoAttached {
    pub upload: UploadItem,
    pub step: StepRecord,
    pub photo: StepPhoto,
}

/// Main engine interface.
pub struct Workflow {
    pub(crate) db_path: PathBuf,
    pub(crate) config: Arc<WorkflowConfig>,
    pub(crate) drafts: DraftSignatures,
    pub(crate) progress_cache: Mutex<HashMap<u64, InterventionProgress>>,
    pub(crate) photos: PhotoPipeline,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("db_path", &self.db_path)
            .field("photos", &self.photos)
            .finish_non_exhaustive()
    }
}

impl Workflow {
    pub(crate) fn new(db_path: PathBuf, config: Arc<WorkflowConfig>, photos: PhotoPipeline) -> Self {
        Self {
            db_path,
            config,
            drafts: DraftSignatures::new(),
            progress_cache: Mutex::new(HashMap::new()),
            photos,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn database_path(&self) -> &std::path::Path {
        &self.db_path
    }

    pub fn photos(&self) -> &PhotoPipeline {
        &self.photos
    }

    /// Runs `op` against a fresh connection on the blocking pool.
    pub(crate) async fn with_db<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database, &WorkflowConfig) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        let config = Arc::clone(&self.config);
        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            op(&mut db, &config)
        })
        .await
        .map_err(WorkflowError::join)?
    }

    /// Drops the cached progress view of an intervention.
    pub(crate) async fn evict_progress(&self, intervention_id: u64) {
        self.progress_cache.lock().await.remove(&intervention_id);
    }
}
