//! MCP tool handlers.
//!
//! Each handler runs one workflow operation for the server's technician and
//! returns the markdown display of the outcome as text content.

use std::sync::Arc;

use log::debug;
use ppf_core::{
    display::{Interventions, OperationStatus, Photos, Uploads},
    params, Session, Workflow,
};
use rmcp::{
    handler::server::tool::Parameters,
    model::{CallToolResult, Content},
    ErrorData,
};

use super::errors::to_mcp_error;

pub type McpResult = Result<CallToolResult, ErrorData>;

fn text(body: impl Into<String>) -> McpResult {
    Ok(CallToolResult::success(vec![Content::text(body.into())]))
}

/// Handler implementations for the MCP server
pub struct McpHandlers {
    workflow: Arc<Workflow>,
    session: Session,
}

impl McpHandlers {
    pub fn new(workflow: Arc<Workflow>, session: Session) -> Self {
        Self { workflow, session }
    }

    pub async fn start_intervention(&self, Parameters(params): Parameters<params::StartIntervention>) -> McpResult {
        debug!("start_intervention: {params:?}");
        let intervention = self
            .workflow
            .start_intervention(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to start intervention", &e))?;
        text(format!(
            "Started intervention with ID: {}\n\n{intervention}",
            intervention.id
        ))
    }

    pub async fn list_interventions(&self, Parameters(params): Parameters<params::ListInterventions>) -> McpResult {
        debug!("list_interventions: {params:?}");
        let interventions = self
            .workflow
            .list_interventions(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to list interventions", &e))?;
        text(format!("# Interventions\n\n{}", Interventions(interventions)))
    }

    pub async fn show_intervention(&self, Parameters(params): Parameters<params::InterventionRef>) -> McpResult {
        debug!("show_intervention: {params:?}");
        let intervention = self
            .workflow
            .get_intervention(&self.session, params.intervention_id)
            .await
            .map_err(|e| to_mcp_error("Failed to get intervention", &e))?;
        text(intervention.to_string())
    }

    pub async fn show_progress(&self, Parameters(params): Parameters<params::InterventionRef>) -> McpResult {
        debug!("show_progress: {params:?}");
        let progress = self
            .workflow
            .progress(&self.session, params.intervention_id)
            .await
            .map_err(|e| to_mcp_error("Failed to load progress", &e))?;
        text(progress.to_string())
    }

    pub async fn current_step(&self, Parameters(params): Parameters<params::InterventionRef>) -> McpResult {
        debug!("current_step: {params:?}");
        let current = self
            .workflow
            .current_step(&self.session, params.intervention_id)
            .await
            .map_err(|e| to_mcp_error("Failed to determine current step", &e))?;
        let status = match current {
            Some(step) => OperationStatus::success(format!("Current step: {step}")),
            None => OperationStatus::success("All steps completed".to_string()),
        };
        text(status.to_string())
    }

    pub async fn can_access_step(&self, Parameters(params): Parameters<params::StepRef>) -> McpResult {
        debug!("can_access_step: {params:?}");
        let allowed = self
            .workflow
            .can_access_step(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to check step access", &e))?;
        let status = if allowed {
            OperationStatus::success(format!("Step '{}' is accessible", params.step_type))
        } else {
            OperationStatus::failure(format!(
                "Step '{}' is locked until its mandatory predecessors are completed",
                params.step_type
            ))
        };
        text(status.to_string())
    }

    pub async fn begin_step(&self, Parameters(params): Parameters<params::StepRef>) -> McpResult {
        debug!("begin_step: {params:?}");
        let step = self
            .workflow
            .begin_step(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to begin step", &e))?;
        text(step.to_string())
    }

    pub async fn save_draft(&self, Parameters(params): Parameters<params::SaveDraft>) -> McpResult {
        debug!("save_draft: {params:?}");
        let saved = self
            .workflow
            .save_draft(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to save draft", &e))?;
        text(saved.to_string())
    }

    pub async fn advance_step(&self, Parameters(params): Parameters<params::AdvanceStep>) -> McpResult {
        debug!("advance_step: {params:?}");
        let advanced = self
            .workflow
            .advance_to_step(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to complete step", &e))?;
        text(advanced.to_string())
    }

    pub async fn approve_step(&self, Parameters(params): Parameters<params::StepRef>) -> McpResult {
        debug!("approve_step: {params:?}");
        let step = self
            .workflow
            .approve_step(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to approve step", &e))?;
        text(step.to_string())
    }

    pub async fn finalize_intervention(
        &self,
        Parameters(params): Parameters<params::FinalizeIntervention>,
    ) -> McpResult {
        debug!("finalize_intervention: {params:?}");
        let finalized = self
            .workflow
            .finalize(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to finalize intervention", &e))?;
        text(finalized.to_string())
    }

    pub async fn capture_photo(&self, Parameters(params): Parameters<params::CapturePhoto>) -> McpResult {
        debug!("capture_photo: {params:?}");
        let attached = self
            .workflow
            .capture_photo(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to capture photo", &e))?;
        text(attached.to_string())
    }

    pub async fn retry_upload(&self, Parameters(params): Parameters<params::UploadRef>) -> McpResult {
        debug!("retry_upload: {params:?}");
        let attached = self
            .workflow
            .retry_upload(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to retry upload", &e))?;
        text(attached.to_string())
    }

    pub async fn list_uploads(&self) -> McpResult {
        let uploads = self
            .workflow
            .upload_items(&self.session)
            .await
            .map_err(|e| to_mcp_error("Failed to list uploads", &e))?;
        text(format!("# Uploads\n\n{}", Uploads(uploads)))
    }

    pub async fn acknowledge_upload(&self, Parameters(params): Parameters<params::UploadRef>) -> McpResult {
        debug!("acknowledge_upload: {params:?}");
        let item = self
            .workflow
            .acknowledge_upload(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to acknowledge upload", &e))?;
        text(OperationStatus::success(format!("Removed upload {} ({})", item.id, item.status)).to_string())
    }

    pub async fn step_photos(&self, Parameters(params): Parameters<params::StepRef>) -> McpResult {
        debug!("step_photos: {params:?}");
        let photos = self
            .workflow
            .step_photos(&self.session, &params)
            .await
            .map_err(|e| to_mcp_error("Failed to list photos", &e))?;
        text(Photos(photos).to_string())
    }
}
