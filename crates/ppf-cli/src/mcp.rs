//! MCP server for the intervention workflow.
//!
//! Exposes the workflow operations as tools over stdio. Every call runs on
//! behalf of the technician the server was started for.

use std::{future::Future, sync::Arc};

use anyhow::Result;
use log::{debug, error, info};
use ppf_core::{params, Session, Workflow};
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use tokio::signal::unix::{signal, SignalKind};

pub mod errors;
pub mod handlers;

pub use handlers::McpResult;
use handlers::McpHandlers;

/// MCP server for PPF interventions
#[derive(Clone)]
pub struct PpfMcpServer {
    workflow: Arc<Workflow>,
    session: Session,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl PpfMcpServer {
    pub fn new(workflow: Workflow, session: Session) -> Self {
        Self {
            workflow: Arc::new(workflow),
            session,
            tool_router: Self::tool_router(),
        }
    }

    fn handlers(&self) -> McpHandlers {
        McpHandlers::new(self.workflow.clone(), self.session.clone())
    }

    #[tool(
        name = "start_intervention",
        description = "Start a new PPF intervention for a task reference. Creates one pending record per catalog step (inspection, preparation, installation, quality_control, finalization) and returns the intervention ID."
    )]
    async fn start_intervention(&self, params: Parameters<params::StartIntervention>) -> McpResult {
        self.handlers().start_intervention(params).await
    }

    #[tool(
        name = "list_interventions",
        description = "List interventions newest first. Optionally filter by status (not_started, in_progress, completed) or task_ref."
    )]
    async fn list_interventions(&self, params: Parameters<params::ListInterventions>) -> McpResult {
        self.handlers().list_interventions(params).await
    }

    #[tool(
        name = "show_intervention",
        description = "Show an intervention with every step record: status, checklist, notes, photos, quality score and, once finalized, the completion metrics."
    )]
    async fn show_intervention(&self, params: Parameters<params::InterventionRef>) -> McpResult {
        self.handlers().show_intervention(params).await
    }

    #[tool(
        name = "show_progress",
        description = "Show the status of each step and the completion percentage of an intervention."
    )]
    async fn show_progress(&self, params: Parameters<params::InterventionRef>) -> McpResult {
        self.handlers().show_progress(params).await
    }

    #[tool(
        name = "current_step",
        description = "Return the step to resume at: the earliest incomplete step whose mandatory predecessors are completed."
    )]
    async fn current_step(&self, params: Parameters<params::InterventionRef>) -> McpResult {
        self.handlers().current_step(params).await
    }

    #[tool(
        name = "can_access_step",
        description = "Check whether a step can be opened: completed steps are always readable, other steps need their mandatory predecessors completed."
    )]
    async fn can_access_step(&self, params: Parameters<params::StepRef>) -> McpResult {
        self.handlers().can_access_step(params).await
    }

    #[tool(
        name = "begin_step",
        description = "Mark a pending step as in progress. Fails while an earlier mandatory step is incomplete."
    )]
    async fn begin_step(&self, params: Parameters<params::StepRef>) -> McpResult {
        self.handlers().begin_step(params).await
    }

    #[tool(
        name = "save_draft",
        description = "Save in-progress data of a step (collected_data, notes, photos) without completing it. Identical consecutive drafts are not written again. Set invalidate=true to refresh the cached progress view."
    )]
    async fn save_draft(&self, params: Parameters<params::SaveDraft>) -> McpResult {
        self.handlers().save_draft(params).await
    }

    #[tool(
        name = "advance_step",
        description = "Complete a step with its collected_data, photos and optional quality_score (0-100). Enforces predecessor completion, photo minimum and maximum, required fields and defect resolution. Advancing the finalization step finalizes the intervention."
    )]
    async fn advance_step(&self, params: Parameters<params::AdvanceStep>) -> McpResult {
        self.handlers().advance_step(params).await
    }

    #[tool(
        name = "approve_step",
        description = "Record supervisor approval of a completed step that is flagged for approval."
    )]
    async fn approve_step(&self, params: Parameters<params::StepRef>) -> McpResult {
        self.handlers().approve_step(params).await
    }

    #[tool(
        name = "finalize_intervention",
        description = "Complete the finalization step and close the intervention. Computes completion metrics (checklist completion, photo count, weighted quality score, unresolved defects) and whether supervisor approval is required. Irreversible; nothing is saved if a rule fails."
    )]
    async fn finalize_intervention(&self, params: Parameters<params::FinalizeIntervention>) -> McpResult {
        self.handlers().finalize_intervention(params).await
    }

    #[tool(
        name = "capture_photo",
        description = "Prepare an image file (downscale, JPEG re-encode), upload it and attach its URL to a step. Fails with 'Upload photo indisponible hors ligne' while offline."
    )]
    async fn capture_photo(&self, params: Parameters<params::CapturePhoto>) -> McpResult {
        self.handlers().capture_photo(params).await
    }

    #[tool(
        name = "retry_upload",
        description = "Deliver a failed upload again and attach it to its step."
    )]
    async fn retry_upload(&self, params: Parameters<params::UploadRef>) -> McpResult {
        self.handlers().retry_upload(params).await
    }

    #[tool(
        name = "list_uploads",
        description = "List tracked photo uploads with their status (queued, uploading, completed, error) and progress."
    )]
    async fn list_uploads(&self) -> McpResult {
        self.handlers().list_uploads().await
    }

    #[tool(
        name = "acknowledge_upload",
        description = "Remove a completed or failed upload from the upload list."
    )]
    async fn acknowledge_upload(&self, params: Parameters<params::UploadRef>) -> McpResult {
        self.handlers().acknowledge_upload(params).await
    }

    #[tool(
        name = "step_photos",
        description = "List the photos attached to a step with their capture metadata."
    )]
    async fn step_photos(&self, params: Parameters<params::StepRef>) -> McpResult {
        self.handlers().step_photos(params).await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for PpfMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ppf".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(r#"PPF guides a technician through a paint-protection-film intervention.

## Steps
inspection → preparation (optional) → installation → quality_control → finalization

A step can only be begun or completed once every earlier mandatory step is completed. Use `current_step` to find where to resume.

## Typical flow
1. `start_intervention` with the task reference
2. For each step: `begin_step`, `save_draft` while working, `capture_photo` for each required photo, then `advance_step`
3. `advance_step` on finalization (or `finalize_intervention`) closes the intervention and reports whether supervisor approval is required

## Rules
- Photo minimum and maximum per step come from the step catalog
- Installation requires `zones`, inspection and quality control require a `checklist`
- Every reported defect must be resolved or accepted before its step is completed
- Finalized interventions cannot be changed"#.to_string()),
        }
    }
}

/// Run the MCP server with stdio transport
pub async fn run_stdio_server(server: PpfMcpServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting PPF MCP server on stdio");
    debug!("Server created with {} tools", server.tool_router.list_all().len());

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("serving error: {e:?}");
    })?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP server stopped normally"),
                Err(e) => error!("MCP server error: {e:?}"),
            }
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
    }

    info!("MCP server shutdown complete");
    Ok(())
}
