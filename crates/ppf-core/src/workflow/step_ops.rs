//! Step transitions.

use log::{debug, info};

use super::{StepAdvanced, Workflow};
use crate::{
    db::step_queries::StepCompletion,
    draft::StepKey,
    error::{Result, WorkflowError},
    models::{progress_percentage, StepRecord, StepStatus},
    params::{AdvanceStep, FinalizeIntervention, StepRef},
    sequencer::Sequencer,
    session::Session,
};

/// Rejects scores outside 0..=100.
pub(crate) fn check_quality_score(score: Option<f64>) -> Result<()> {
    match score {
        Some(s) if !(0.0..=100.0).contains(&s) => Err(WorkflowError::invalid_input("quality_score")
            .with_reason(format!("{s} is outside 0 to 100"))),
        _ => Ok(()),
    }
}

impl Workflow {
    /// Opens a pending step, moving it to `in_progress`.
    pub async fn begin_step(&self, session: &Session, params: &StepRef) -> Result<StepRecord> {
        session.require()?;
        let StepRef {
            intervention_id,
            step_type,
        } = *params;

        let step = self
            .with_db(move |db, config| {
                db.begin_step(intervention_id, step_type, |steps, record| {
                    let sequencer = Sequencer::new(config);
                    sequencer.check_prerequisites(steps, step_type)?;
                    sequencer.ensure_transition(record, StepStatus::InProgress)
                })
            })
            .await?;
        self.evict_progress(intervention_id).await;
        debug!("Step '{step_type}' of intervention {intervention_id} in progress");
        Ok(step)
    }

    /// Validates and completes a step, then reports where to continue.
    ///
    /// Advancing the terminal step finalizes the intervention; the metrics
    /// are returned with the result.
    pub async fn advance_to_step(&self, session: &Session, params: &AdvanceStep) -> Result<StepAdvanced> {
        session.require()?;
        check_quality_score(params.quality_score)?;

        if params.step_type == self.config.catalog.terminal() {
            let finalized = self
                .finalize(session, &FinalizeIntervention::from(params))
                .await?;
            let step = finalized
                .intervention
                .steps
                .iter()
                .find(|s| s.step_type == params.step_type)
                .cloned()
                .ok_or(WorkflowError::StepNotFound {
                    intervention_id: params.intervention_id,
                    step: params.step_type,
                })?;
            return Ok(StepAdvanced {
                step,
                next_step: None,
                progress_percentage: finalized.intervention.progress_percentage,
                metrics: Some(finalized.metrics),
            });
        }

        let intervention_id = params.intervention_id;
        let step_type = params.step_type;
        let request = params.clone();
        let (step, steps) = self
            .with_db(move |db, config| {
                db.complete_step(intervention_id, step_type, |steps, record| {
                    let sequencer = Sequencer::new(config);
                    sequencer.check_prerequisites(steps, step_type)?;
                    let photos = request
                        .photos
                        .clone()
                        .or_else(|| record.photo_urls.clone())
                        .unwrap_or_default();
                    sequencer.validate_completion(record, &request.collected_data, photos.len() as u32)?;
                    Ok(StepCompletion {
                        collected_data: request.collected_data,
                        notes: request.notes,
                        photo_urls: photos,
                        quality_score: request.quality_score,
                        quality_check_passed: request.quality_check_passed,
                        issues: request.issues,
                    })
                })
            })
            .await?;

        self.drafts
            .forget(StepKey {
                intervention_id,
                step_type,
            })
            .await;
        self.evict_progress(intervention_id).await;

        let next_step = Sequencer::new(&self.config).first_allowed_step(&steps);
        let progress = progress_percentage(&steps);
        info!(
            "Step '{step_type}' of intervention {intervention_id} completed, progress {progress}%, next {}",
            next_step.map_or("none", |s| s.as_str())
        );

        Ok(StepAdvanced {
            step,
            next_step,
            progress_percentage: progress,
            metrics: None,
        })
    }

    /// Records the caller's sign-off on a completed step flagged for
    /// supervisor approval.
    pub async fn approve_step(&self, session: &Session, params: &StepRef) -> Result<StepRecord> {
        let approver = session.require()?.to_string();
        let StepRef {
            intervention_id,
            step_type,
        } = *params;

        let step = self
            .with_db(move |db, _| db.approve_step(intervention_id, step_type, &approver))
            .await?;
        self.evict_progress(intervention_id).await;
        info!("Step '{step_type}' of intervention {intervention_id} approved by {}", session.user_id);
        Ok(step)
    }
}
