//! Finalization.

use log::info;

use super::{step_ops::check_quality_score, Finalized, Workflow};
use crate::{
    aggregator::Aggregator,
    db::step_queries::StepCompletion,
    error::Result,
    params::FinalizeIntervention,
    sequencer::Sequencer,
    session::Session,
};

impl Workflow {
    /// Completes the terminal step, aggregates every step record and closes
    /// the intervention. Irreversible.
    ///
    /// Nothing is persisted when a prerequisite, a validation rule or the
    /// aggregation fails.
    pub async fn finalize(&self, session: &Session, params: &FinalizeIntervention) -> Result<Finalized> {
        session.require()?;
        check_quality_score(params.quality_score)?;

        let intervention_id = params.intervention_id;
        let request = params.clone();
        let (intervention, metrics) = self
            .with_db(move |db, config| {
                let terminal = config.catalog.terminal();
                let data = request.finalization_data.clone();
                db.finalize_intervention(
                    intervention_id,
                    terminal,
                    &data,
                    |steps, record| {
                        let sequencer = Sequencer::new(config);
                        sequencer.check_prerequisites(steps, terminal)?;
                        let photos = request
                            .photos
                            .clone()
                            .or_else(|| record.photo_urls.clone())
                            .unwrap_or_default();
                        sequencer.validate_completion(record, &request.finalization_data, photos.len() as u32)?;
                        Ok(StepCompletion {
                            collected_data: request.finalization_data,
                            notes: request.notes,
                            photo_urls: photos,
                            quality_score: request.quality_score,
                            quality_check_passed: None,
                            issues: Vec::new(),
                        })
                    },
                    |steps| Aggregator::new(config).aggregate(intervention_id, steps),
                )
            })
            .await?;

        self.drafts.forget_intervention(intervention_id).await;
        self.evict_progress(intervention_id).await;
        info!(
            "Intervention {intervention_id} finalized: score {}, {} photo(s), approval {}",
            metrics
                .quality_score
                .map_or_else(|| "n/a".to_string(), |s| format!("{s:.1}")),
            metrics.total_photos,
            if metrics.requires_supervisor_approval {
                "required"
            } else {
                "not required"
            }
        );

        Ok(Finalized {
            intervention,
            metrics,
        })
    }
}
