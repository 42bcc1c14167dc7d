//! Finalization-time quality aggregation.
//!
//! Folds every step record of an intervention into one
//! [`CompletionMetrics`] value and decides whether a supervisor has to sign
//! off on the job.

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::{
    config::WorkflowConfig,
    error::{Result, WorkflowError},
    models::{Defect, DefectSeverity, StepRecord, StepType},
};

/// A defect left unresolved at finalization, tagged with its step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnresolvedDefect {
    pub step: StepType,
    #[serde(flatten)]
    pub defect: Defect,
}

/// Why supervisor approval is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ApprovalReason {
    /// A step record carries the approval flag
    StepFlagged { step: StepType },
    /// The aggregated score is below the acceptance threshold
    LowQualityScore { score: f64, threshold: f64 },
    /// An unresolved defect reaches the configured severity
    SevereDefect {
        step: StepType,
        kind: String,
        severity: DefectSeverity,
    },
}

/// Completion summary persisted with the finalized intervention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionMetrics {
    pub completed_steps: u32,
    pub total_steps: u32,
    pub checklist_completed: u32,
    pub checklist_total: u32,
    pub total_photos: u32,
    /// Weighted average of the step scores, `None` when no step was scored
    pub quality_score: Option<f64>,
    pub unresolved_defects: Vec<UnresolvedDefect>,
    pub requires_supervisor_approval: bool,
    pub approval_reasons: Vec<ApprovalReason>,
}

impl CompletionMetrics {
    /// Share of checked checklist items, 1.0 when there is no checklist.
    pub fn checklist_completion_ratio(&self) -> f64 {
        if self.checklist_total == 0 {
            1.0
        } else {
            f64::from(self.checklist_completed) / f64::from(self.checklist_total)
        }
    }
}

/// Computes [`CompletionMetrics`] from step records.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    config: &'a WorkflowConfig,
}

impl<'a> Aggregator<'a> {
    pub fn new(config: &'a WorkflowConfig) -> Self {
        Self { config }
    }

    /// Aggregates `steps`, which must reflect the state at finalization
    /// (the terminal step already marked completed). Only completed steps
    /// contribute checklist items, photos, scores and defects.
    pub fn aggregate(&self, intervention_id: u64, steps: &[StepRecord]) -> Result<CompletionMetrics> {
        let missing: Vec<StepType> = steps
            .iter()
            .filter(|s| s.is_mandatory && !s.is_completed())
            .map(|s| s.step_type)
            .collect();
        if !missing.is_empty() {
            return Err(WorkflowError::FinalizationPrerequisiteNotMet {
                intervention_id,
                missing,
            });
        }

        let mut metrics = CompletionMetrics {
            completed_steps: 0,
            total_steps: steps.len() as u32,
            checklist_completed: 0,
            checklist_total: 0,
            total_photos: 0,
            quality_score: None,
            unresolved_defects: Vec::new(),
            requires_supervisor_approval: false,
            approval_reasons: Vec::new(),
        };
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut plain_sum = 0.0;
        let mut scored = 0u32;

        for step in steps {
            if step.requires_supervisor_approval {
                metrics
                    .approval_reasons
                    .push(ApprovalReason::StepFlagged { step: step.step_type });
            }
            // Skipped optional steps may hold a draft; it is not evidence
            if !step.is_completed() {
                if step.defects().is_err() {
                    debug!(
                        "Ignoring malformed draft defects of skipped step '{}' on intervention {intervention_id}",
                        step.step_type
                    );
                }
                continue;
            }
            self.check_consistency(intervention_id, step)?;
            metrics.completed_steps += 1;

            for (_, answer) in step.checklist() {
                metrics.checklist_total += 1;
                if answer.as_bool() == Some(true) {
                    metrics.checklist_completed += 1;
                }
            }
            metrics.total_photos += step.photo_count();

            if let Some(score) = step.quality_score {
                let weight = self
                    .config
                    .catalog
                    .get(step.step_type)
                    .map_or(1.0, |d| d.quality_weight);
                weighted_sum += score * weight;
                weight_total += weight;
                plain_sum += score;
                scored += 1;
            }

            let defects = step
                .defects()
                .map_err(|e| inconsistent(intervention_id, step.step_type, format!("malformed defects: {e}")))?;
            for defect in defects.into_iter().filter(|d| !d.resolved) {
                if defect.severity >= self.config.approval_severity {
                    metrics.approval_reasons.push(ApprovalReason::SevereDefect {
                        step: step.step_type,
                        kind: defect.kind.clone(),
                        severity: defect.severity,
                    });
                }
                metrics.unresolved_defects.push(UnresolvedDefect {
                    step: step.step_type,
                    defect,
                });
            }
        }

        metrics.quality_score = if weight_total > 0.0 {
            Some(weighted_sum / weight_total)
        } else if scored > 0 {
            Some(plain_sum / f64::from(scored))
        } else {
            None
        };

        if let Some(score) = metrics.quality_score {
            if score < self.config.acceptance_threshold {
                metrics.approval_reasons.push(ApprovalReason::LowQualityScore {
                    score,
                    threshold: self.config.acceptance_threshold,
                });
            }
        }
        metrics.requires_supervisor_approval = !metrics.approval_reasons.is_empty();

        Ok(metrics)
    }

    /// A completed step must still satisfy its schema.
    fn check_consistency(&self, intervention_id: u64, step: &StepRecord) -> Result<()> {
        if step.requires_photos && step.photo_count() < step.min_photos_required {
            return Err(inconsistent(
                intervention_id,
                step.step_type,
                format!(
                    "{} photo(s) attached, {} required",
                    step.photo_count(),
                    step.min_photos_required
                ),
            ));
        }
        if let Some(def) = self.config.catalog.get(step.step_type) {
            if let Some(field) = def
                .required_fields
                .iter()
                .find(|f| step.collected_data.get(f.as_str()).map_or(true, |v| v.is_null()))
            {
                return Err(inconsistent(
                    intervention_id,
                    step.step_type,
                    format!("required field '{field}' is missing"),
                ));
            }
        }
        if step.quality_score.is_some_and(|s| !(0.0..=100.0).contains(&s)) {
            return Err(inconsistent(
                intervention_id,
                step.step_type,
                "quality score out of range".to_string(),
            ));
        }
        Ok(())
    }
}

fn inconsistent(intervention_id: u64, step: StepType, reason: String) -> WorkflowError {
    error!("Aggregation data inconsistent for intervention {intervention_id}, step {step}: {reason}");
    WorkflowError::AggregationDataInconsistent { step, reason }
}
