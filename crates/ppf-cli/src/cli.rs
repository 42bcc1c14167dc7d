//! Subcommands and their handlers.
//!
//! Each argument struct converts into the matching core parameter type, so
//! clap concerns never leak into `ppf-core`:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → Workflow
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use ppf_core::{
    display::{Interventions, OperationStatus, Photos},
    params::*,
    InterventionStatus, Session, StepType, Workflow,
};
use serde_json::Value;

use crate::renderer::TerminalRenderer;

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

// ============================================================================
// Intervention commands
// ============================================================================

/// Start a new intervention for a task
#[derive(Args)]
pub struct StartArgs {
    #[arg(help = "Reference of the task the intervention belongs to")]
    pub task_ref: String,
}

impl From<StartArgs> for StartIntervention {
    fn from(val: StartArgs) -> Self {
        StartIntervention {
            task_ref: val.task_ref,
        }
    }
}

/// List interventions, newest first
#[derive(Args)]
pub struct ListArgs {
    #[arg(long, help = "Only interventions in this status (not_started, in_progress, completed)")]
    pub status: Option<InterventionStatus>,
    #[arg(long, help = "Only interventions of this task")]
    pub task_ref: Option<String>,
}

impl From<ListArgs> for ListInterventions {
    fn from(val: ListArgs) -> Self {
        ListInterventions {
            status: val.status,
            task_ref: val.task_ref,
        }
    }
}

#[derive(Args)]
pub struct InterventionIdArgs {
    #[arg(help = "Unique identifier of the intervention")]
    pub id: u64,
}

impl From<InterventionIdArgs> for InterventionRef {
    fn from(val: InterventionIdArgs) -> Self {
        InterventionRef { intervention_id: val.id }
    }
}

/// Complete the terminal step and close the intervention
#[derive(Args)]
pub struct FinalizeArgs {
    #[arg(help = "Unique identifier of the intervention")]
    pub id: u64,
    #[arg(long, value_parser = parse_json, help = "Finalization data as a JSON object")]
    pub data: Option<Value>,
    #[arg(short, long, help = "Closing notes")]
    pub notes: Option<String>,
    #[arg(long = "photo", help = "Photo URL of the terminal step, repeatable")]
    pub photos: Vec<String>,
    #[arg(long, help = "Quality score of the terminal step, 0 to 100")]
    pub score: Option<f64>,
}

impl From<FinalizeArgs> for FinalizeIntervention {
    fn from(val: FinalizeArgs) -> Self {
        FinalizeIntervention {
            intervention_id: val.id,
            finalization_data: val.data.unwrap_or_else(empty_object),
            notes: val.notes,
            photos: (!val.photos.is_empty()).then_some(val.photos),
            quality_score: val.score,
        }
    }
}

#[derive(Subcommand)]
pub enum InterventionCommands {
    /// Start a new intervention
    Start(StartArgs),
    /// List interventions
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show an intervention with all its steps
    Show(InterventionIdArgs),
    /// Show step statuses and completion percentage
    Progress(InterventionIdArgs),
    /// Show the step to resume at
    Current(InterventionIdArgs),
    /// Finalize an intervention
    Finalize(FinalizeArgs),
}

// ============================================================================
// Step commands
// ============================================================================

#[derive(Args)]
pub struct StepRefArgs {
    #[arg(help = "Unique identifier of the intervention")]
    pub id: u64,
    #[arg(help = "Step type (inspection, preparation, installation, quality_control, finalization)")]
    pub step: StepType,
}

impl From<StepRefArgs> for StepRef {
    fn from(val: StepRefArgs) -> Self {
        StepRef {
            intervention_id: val.id,
            step_type: val.step,
        }
    }
}

/// Save in-progress step data without completing the step
#[derive(Args)]
pub struct DraftArgs {
    #[command(flatten)]
    pub step: StepRefArgs,
    #[arg(long, value_parser = parse_json, help = "Collected data as a JSON object")]
    pub data: Option<Value>,
    #[arg(short, long, help = "Step notes")]
    pub notes: Option<String>,
    #[arg(long = "photo", help = "Photo URL, repeatable; replaces the step's photo list")]
    pub photos: Vec<String>,
    #[arg(long, help = "Refresh the cached progress view after saving")]
    pub refresh: bool,
}

impl From<DraftArgs> for SaveDraft {
    fn from(val: DraftArgs) -> Self {
        SaveDraft {
            intervention_id: val.step.id,
            step_type: val.step.step,
            collected_data: val.data.unwrap_or_else(empty_object),
            notes: val.notes,
            photos: (!val.photos.is_empty()).then_some(val.photos),
            invalidate: val.refresh,
        }
    }
}

/// Complete a step
#[derive(Args)]
pub struct AdvanceArgs {
    #[command(flatten)]
    pub step: StepRefArgs,
    #[arg(long, value_parser = parse_json, help = "Collected data as a JSON object")]
    pub data: Option<Value>,
    #[arg(short, long, help = "Step notes")]
    pub notes: Option<String>,
    #[arg(long = "photo", help = "Photo URL, repeatable; defaults to the photos already attached")]
    pub photos: Vec<String>,
    #[arg(long, help = "Quality score, 0 to 100")]
    pub score: Option<f64>,
    #[arg(long, help = "Outcome of the step's quality check")]
    pub passed: Option<bool>,
    #[arg(long = "issue", help = "Issue found during the step, repeatable")]
    pub issues: Vec<String>,
}

impl From<AdvanceArgs> for AdvanceStep {
    fn from(val: AdvanceArgs) -> Self {
        AdvanceStep {
            intervention_id: val.step.id,
            step_type: val.step.step,
            collected_data: val.data.unwrap_or_else(empty_object),
            notes: val.notes,
            photos: (!val.photos.is_empty()).then_some(val.photos),
            quality_score: val.score,
            quality_check_passed: val.passed,
            issues: val.issues,
        }
    }
}

#[derive(Subcommand)]
pub enum StepCommands {
    /// Mark a pending step as in progress
    #[command(alias = "b")]
    Begin(StepRefArgs),
    /// Check whether a step may be worked on now
    Access(StepRefArgs),
    /// Save a draft of a step
    #[command(alias = "d")]
    Draft(DraftArgs),
    /// Complete a step
    #[command(alias = "a")]
    Advance(AdvanceArgs),
    /// Record supervisor approval of a completed step
    Approve(StepRefArgs),
}

// ============================================================================
// Photo commands
// ============================================================================

/// Prepare, upload and attach a photo to a step
#[derive(Args)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub step: StepRefArgs,
    #[arg(help = "Image file to attach (PNG or JPEG)")]
    pub file: PathBuf,
    #[arg(long, help = "Shooting angle, e.g. front or left-quarter")]
    pub angle: Option<String>,
    #[arg(long, help = "Photo category, e.g. defect or overview")]
    pub category: Option<String>,
}

impl From<CaptureArgs> for CapturePhoto {
    fn from(val: CaptureArgs) -> Self {
        CapturePhoto {
            intervention_id: val.step.id,
            step_type: val.step.step,
            source: val.file,
            angle: val.angle,
            category: val.category,
            camera: None,
        }
    }
}

#[derive(Subcommand)]
pub enum PhotoCommands {
    /// Capture a photo for a step
    #[command(alias = "c")]
    Capture(CaptureArgs),
    /// List the photos attached to a step
    #[command(alias = "ls")]
    List(StepRefArgs),
}

// ============================================================================
// Handlers
// ============================================================================

/// Runs subcommands against a workflow on behalf of one technician.
pub struct Cli {
    workflow: Workflow,
    session: Session,
    renderer: TerminalRenderer,
}

impl Cli {
    pub fn new(workflow: Workflow, session: Session, renderer: TerminalRenderer) -> Self {
        Self {
            workflow,
            session,
            renderer,
        }
    }

    pub async fn handle_intervention_command(&self, command: InterventionCommands) -> Result<()> {
        match command {
            InterventionCommands::Start(args) => {
                let intervention = self
                    .workflow
                    .start_intervention(&self.session, &args.into())
                    .await
                    .context("Failed to start intervention")?;
                self.renderer.render(&format!(
                    "Started intervention with ID: {}\n\n{intervention}",
                    intervention.id
                ))
            }
            InterventionCommands::List(args) => self.list_interventions(&args.into()).await,
            InterventionCommands::Show(args) => {
                let params = InterventionRef::from(args);
                let intervention = self
                    .workflow
                    .get_intervention(&self.session, params.intervention_id)
                    .await
                    .context("Failed to get intervention")?;
                self.renderer.render(&intervention.to_string())
            }
            InterventionCommands::Progress(args) => {
                let params = InterventionRef::from(args);
                let progress = self
                    .workflow
                    .progress(&self.session, params.intervention_id)
                    .await
                    .context("Failed to load progress")?;
                self.renderer.render(&progress.to_string())
            }
            InterventionCommands::Current(args) => {
                let params = InterventionRef::from(args);
                let current = self
                    .workflow
                    .current_step(&self.session, params.intervention_id)
                    .await
                    .context("Failed to determine current step")?;
                let status = match current {
                    Some(step) => OperationStatus::success(format!("Current step: {}", step.label())),
                    None => OperationStatus::success("All steps completed".to_string()),
                };
                self.renderer.render(&status.to_string())
            }
            InterventionCommands::Finalize(args) => {
                let finalized = self
                    .workflow
                    .finalize(&self.session, &args.into())
                    .await
                    .context("Failed to finalize intervention")?;
                self.renderer.render(&finalized.to_string())
            }
        }
    }

    pub async fn handle_step_command(&self, command: StepCommands) -> Result<()> {
        match command {
            StepCommands::Begin(args) => {
                let step = self
                    .workflow
                    .begin_step(&self.session, &args.into())
                    .await
                    .context("Failed to begin step")?;
                self.renderer.render(&step.to_string())
            }
            StepCommands::Access(args) => {
                let params = StepRef::from(args);
                let allowed = self
                    .workflow
                    .can_access_step(&self.session, &params)
                    .await
                    .context("Failed to check step access")?;
                let status = if allowed {
                    OperationStatus::success(format!("Step '{}' is accessible", params.step_type))
                } else {
                    OperationStatus::failure(format!(
                        "Step '{}' is locked until its mandatory predecessors are completed",
                        params.step_type
                    ))
                };
                self.renderer.render(&status.to_string())
            }
            StepCommands::Draft(args) => {
                let saved = self
                    .workflow
                    .save_draft(&self.session, &args.into())
                    .await
                    .context("Failed to save draft")?;
                self.renderer.render(&saved.to_string())
            }
            StepCommands::Advance(args) => {
                let advanced = self
                    .workflow
                    .advance_to_step(&self.session, &args.into())
                    .await
                    .context("Failed to complete step")?;
                self.renderer.render(&advanced.to_string())
            }
            StepCommands::Approve(args) => {
                let step = self
                    .workflow
                    .approve_step(&self.session, &args.into())
                    .await
                    .context("Failed to approve step")?;
                self.renderer.render(&step.to_string())
            }
        }
    }

    pub async fn handle_photo_command(&self, command: PhotoCommands) -> Result<()> {
        match command {
            PhotoCommands::Capture(args) => {
                let attached = self
                    .workflow
                    .capture_photo(&self.session, &args.into())
                    .await
                    .context("Failed to capture photo")?;
                self.renderer.render(&attached.to_string())
            }
            PhotoCommands::List(args) => {
                let photos = self
                    .workflow
                    .step_photos(&self.session, &args.into())
                    .await
                    .context("Failed to list photos")?;
                self.renderer.render(&Photos(photos).to_string())
            }
        }
    }

    pub async fn list_interventions(&self, params: &ListInterventions) -> Result<()> {
        let interventions = self
            .workflow
            .list_interventions(&self.session, params)
            .await
            .context("Failed to list interventions")?;
        self.renderer.render(&Interventions(interventions).to_string())
    }

    /// Answers one boundary request. The caller inside the request is used
    /// as-is; `--technician` does not apply.
    pub async fn exec(&self, raw: &str) -> Result<()> {
        let response = self.workflow.dispatch_json(raw).await;
        println!("{response}");
        Ok(())
    }
}
