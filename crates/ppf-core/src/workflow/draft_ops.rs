//! Draft autosave.

use log::debug;

use super::{DraftSaved, Workflow};
use crate::{
    draft::{draft_signature, StepKey},
    error::{Result, WorkflowError},
    params::SaveDraft,
    session::Session,
};

impl Workflow {
    /// Saves partially entered step data.
    ///
    /// A payload identical to the last one saved for the step in this
    /// process is not written again; the current record is returned with
    /// `written: false`. The step status never changes here.
    pub async fn save_draft(&self, session: &Session, params: &SaveDraft) -> Result<DraftSaved> {
        session.require()?;

        let key = StepKey {
            intervention_id: params.intervention_id,
            step_type: params.step_type,
        };
        let signature = draft_signature(
            &params.collected_data,
            params.notes.as_deref(),
            params.photos.as_deref(),
        )?;

        if self.drafts.is_unchanged(key, &signature).await {
            debug!(
                "Draft of '{}' on intervention {} unchanged, skipping write",
                key.step_type, key.intervention_id
            );
            let step = self
                .with_db(move |db, _| db.get_step(key.intervention_id, key.step_type))
                .await?
                .ok_or(WorkflowError::StepNotFound {
                    intervention_id: key.intervention_id,
                    step: key.step_type,
                })?;
            return Ok(DraftSaved {
                step,
                written: false,
            });
        }

        let data = params.collected_data.clone();
        let notes = params.notes.clone();
        let photos = params.photos.clone();
        let step = self
            .with_db(move |db, _| {
                db.save_step_draft(
                    key.intervention_id,
                    key.step_type,
                    &data,
                    notes.as_deref(),
                    photos.as_deref(),
                )
            })
            .await?;
        self.drafts.record(key, signature).await;
        debug!(
            "Draft of '{}' on intervention {} saved (revision {})",
            key.step_type, key.intervention_id, step.revision
        );

        if params.invalidate {
            self.evict_progress(key.intervention_id).await;
        }

        Ok(DraftSaved {
            step,
            written: true,
        })
    }

    /// Forgets every draft signature of an intervention so the next save is
    /// written regardless of content.
    pub async fn reset_drafts(&self, intervention_id: u64) {
        self.drafts.forget_intervention(intervention_id).await;
    }
}
