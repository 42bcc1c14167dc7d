//! Intervention lifecycle and read accessors.

use log::info;

use super::Workflow;
use crate::{
    error::{Result, WorkflowError},
    models::{progress_percentage, Intervention, InterventionProgress, StepPhoto, StepType},
    params::{ListInterventions, StartIntervention, StepRef},
    sequencer::Sequencer,
    session::Session,
};

impl Workflow {
    /// Starts an intervention for a task, provisioning one pending step
    /// record per catalog step.
    pub async fn start_intervention(&self, session: &Session, params: &StartIntervention) -> Result<Intervention> {
        let technician = session.require()?.to_string();
        let task_ref = params.task_ref.trim().to_string();
        if task_ref.is_empty() {
            return Err(WorkflowError::invalid_input("task_ref").with_reason("must not be empty"));
        }

        let intervention = self
            .with_db(move |db, config| db.create_intervention(&task_ref, &technician, &config.catalog))
            .await?;
        info!(
            "Started intervention {} for task '{}' ({} steps)",
            intervention.id,
            intervention.task_ref,
            intervention.steps.len()
        );
        Ok(intervention)
    }

    /// Retrieves an intervention with its steps.
    pub async fn get_intervention(&self, session: &Session, intervention_id: u64) -> Result<Intervention> {
        session.require()?;
        self.with_db(move |db, _| db.get_intervention(intervention_id))
            .await?
            .ok_or(WorkflowError::InterventionNotFound {
                id: intervention_id,
            })
    }

    /// Lists interventions, newest first.
    pub async fn list_interventions(&self, session: &Session, params: &ListInterventions) -> Result<Vec<Intervention>> {
        session.require()?;
        let status = params.status;
        let task_ref = params.task_ref.clone();
        self.with_db(move |db, _| db.list_interventions(status, task_ref.as_deref()))
            .await
    }

    /// Steps and progress of an intervention. Served from the progress cache
    /// until a write evicts it.
    pub async fn progress(&self, session: &Session, intervention_id: u64) -> Result<InterventionProgress> {
        session.require()?;
        if let Some(cached) = self.progress_cache.lock().await.get(&intervention_id) {
            return Ok(cached.clone());
        }

        let intervention = self.get_intervention(session, intervention_id).await?;
        let view = InterventionProgress {
            intervention_id,
            status: intervention.status,
            progress_percentage: progress_percentage(&intervention.steps),
            steps: intervention.steps,
        };
        self.progress_cache
            .lock()
            .await
            .insert(intervention_id, view.clone());
        Ok(view)
    }

    /// The step the technician should resume at, `None` when every step is
    /// completed.
    pub async fn current_step(&self, session: &Session, intervention_id: u64) -> Result<Option<StepType>> {
        let intervention = self.get_intervention(session, intervention_id).await?;
        Ok(Sequencer::new(&self.config).first_allowed_step(&intervention.steps))
    }

    /// Whether the UI may open a step.
    pub async fn can_access_step(&self, session: &Session, params: &StepRef) -> Result<bool> {
        let intervention = self.get_intervention(session, params.intervention_id).await?;
        Ok(Sequencer::new(&self.config).can_access_step(&intervention.steps, params.step_type))
    }

    /// Photos stored for a step with their metadata.
    pub async fn step_photos(&self, session: &Session, params: &StepRef) -> Result<Vec<StepPhoto>> {
        session.require()?;
        let StepRef {
            intervention_id,
            step_type,
        } = *params;
        self.with_db(move |db, _| db.get_step_photos(intervention_id, step_type))
            .await
    }
}
