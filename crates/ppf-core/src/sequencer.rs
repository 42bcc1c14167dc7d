//! Step state machine.
//!
//! Steps advance in strict catalog order. A step becomes accessible once
//! every mandatory step before it is completed; the UI asks
//! [`Sequencer::first_allowed_step`] where to resume instead of tracking its
//! own notion of progress.

use serde_json::Value;

use crate::{
    config::WorkflowConfig,
    error::{Result, WorkflowError},
    models::{checklist_entries, defect_entries, StepRecord, StepStatus, StepType},
};

/// Ordering and completion rules over a set of step records.
#[derive(Debug, Clone, Copy)]
pub struct Sequencer<'a> {
    config: &'a WorkflowConfig,
}

impl<'a> Sequencer<'a> {
    pub fn new(config: &'a WorkflowConfig) -> Self {
        Self { config }
    }

    /// Mandatory steps ordered before `step_type` that are not completed.
    pub fn missing_prerequisites(&self, steps: &[StepRecord], step_type: StepType) -> Vec<StepType> {
        let mut missing: Vec<StepType> = steps
            .iter()
            .filter(|s| s.step_type < step_type && s.is_mandatory && !s.is_completed())
            .map(|s| s.step_type)
            .collect();
        missing.sort();
        missing
    }

    /// Fails with `PrerequisiteNotMet` when an earlier mandatory step is
    /// incomplete.
    pub fn check_prerequisites(&self, steps: &[StepRecord], step_type: StepType) -> Result<()> {
        let missing = self.missing_prerequisites(steps, step_type);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::PrerequisiteNotMet {
                step: step_type,
                missing,
            })
        }
    }

    /// Earliest incomplete step whose prerequisites hold, in catalog order.
    /// `None` once every step is completed.
    pub fn first_allowed_step(&self, steps: &[StepRecord]) -> Option<StepType> {
        let mut ordered: Vec<&StepRecord> = steps.iter().collect();
        ordered.sort_by_key(|s| s.step_type);
        ordered
            .into_iter()
            .filter(|s| !s.is_completed())
            .find(|s| self.missing_prerequisites(steps, s.step_type).is_empty())
            .map(|s| s.step_type)
    }

    /// Completed steps stay readable; otherwise the step must be the current
    /// allowed one or have its prerequisites met.
    pub fn can_access_step(&self, steps: &[StepRecord], step_type: StepType) -> bool {
        let Some(record) = steps.iter().find(|s| s.step_type == step_type) else {
            return false;
        };
        record.is_completed()
            || self.first_allowed_step(steps) == Some(step_type)
            || self.missing_prerequisites(steps, step_type).is_empty()
    }

    /// Validates a status change of one record.
    pub fn ensure_transition(&self, record: &StepRecord, to: StepStatus) -> Result<()> {
        match (record.status, to) {
            (StepStatus::Pending, StepStatus::InProgress)
            | (StepStatus::Pending, StepStatus::Completed)
            | (StepStatus::InProgress, StepStatus::Completed) => Ok(()),
            (StepStatus::Completed, _) => Err(WorkflowError::InvalidTransition {
                step: record.step_type,
                reason: "step is already completed".into(),
            }),
            (from, to) => Err(WorkflowError::InvalidTransition {
                step: record.step_type,
                reason: format!("cannot move from {from} to {to}"),
            }),
        }
    }

    /// Photo-count bounds of a record for a prospective photo list.
    pub fn check_photos(&self, record: &StepRecord, photo_count: u32) -> Result<()> {
        if record.requires_photos && photo_count < record.min_photos_required {
            return Err(WorkflowError::PhotoRequirementNotMet {
                step: record.step_type,
                required: record.min_photos_required,
                actual: photo_count,
            });
        }
        if photo_count > record.max_photos_allowed {
            return Err(WorkflowError::PhotoLimitExceeded {
                step: record.step_type,
                allowed: record.max_photos_allowed,
                actual: photo_count,
            });
        }
        Ok(())
    }

    /// Every rule that must pass before `record` may become completed with
    /// the given payload and photos.
    pub fn validate_completion(
        &self,
        record: &StepRecord,
        collected_data: &Value,
        photo_count: u32,
    ) -> Result<()> {
        self.ensure_transition(record, StepStatus::Completed)?;
        self.check_photos(record, photo_count)?;

        let step = record.step_type;
        if let Some(def) = self.config.catalog.get(step) {
            for field in &def.required_fields {
                if collected_data.get(field).map_or(true, Value::is_null) {
                    return Err(WorkflowError::StepValidationFailed {
                        step,
                        reason: format!("field '{field}' is required"),
                    });
                }
            }
        }

        if step == StepType::QualityControl {
            let unanswered: Vec<&str> = checklist_entries(collected_data)
                .into_iter()
                .filter(|(_, answer)| answer.is_null())
                .map(|(name, _)| name)
                .collect();
            if !unanswered.is_empty() {
                return Err(WorkflowError::StepValidationFailed {
                    step,
                    reason: format!("checklist item(s) not answered: {}", unanswered.join(", ")),
                });
            }
        }

        let defects = defect_entries(collected_data).map_err(|e| {
            WorkflowError::StepValidationFailed {
                step,
                reason: format!("malformed defects list: {e}"),
            }
        })?;
        let open: Vec<String> = defects
            .iter()
            .filter(|d| !d.is_settled())
            .map(|d| d.kind.clone())
            .collect();
        if !open.is_empty() {
            return Err(WorkflowError::StepValidationFailed {
                step,
                reason: format!(
                    "defect(s) must be resolved or accepted: {}",
                    open.join(", ")
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use serde_json::json;

    use super::*;

    fn record(step_type: StepType, status: StepStatus, mandatory: bool) -> StepRecord {
        let now = Timestamp::now();
        StepRecord {
            id: step_type.position() as u64 + 1,
            intervention_id: 1,
            step_type,
            order: step_type.position() as u32,
            status,
            is_mandatory: mandatory,
            requires_photos: true,
            min_photos_required: 2,
            max_photos_allowed: 4,
            collected_data: json!({}),
            notes: None,
            photo_urls: None,
            quality_score: None,
            quality_check_passed: None,
            issues: Vec::new(),
            requires_supervisor_approval: false,
            approved_by: None,
            approved_at: None,
            revision: 0,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn all_steps(statuses: [StepStatus; 5]) -> Vec<StepRecord> {
        StepType::ALL
            .iter()
            .zip(statuses)
            .map(|(step, status)| record(*step, status, *step != StepType::Preparation))
            .collect()
    }

    #[test]
    fn test_first_allowed_step_resumes_in_progress_step() {
        let config = WorkflowConfig::default();
        let sequencer = Sequencer::new(&config);
        let steps = vec![
            record(StepType::Inspection, StepStatus::Completed, true),
            record(StepType::Installation, StepStatus::InProgress, true),
            record(StepType::Finalization, StepStatus::Pending, true),
        ];
        assert_eq!(
            sequencer.first_allowed_step(&steps),
            Some(StepType::Installation)
        );
    }

    #[test]
    fn test_first_allowed_step_never_skips_mandatory_predecessor() {
        let config = WorkflowConfig::default();
        let sequencer = Sequencer::new(&config);
        use StepStatus::{Completed as C, InProgress as I, Pending as P};

        let cases = [
            [P, P, P, P, P],
            [C, P, P, P, P],
            [C, P, C, P, P],
            [C, C, C, I, P],
            [P, C, C, C, P],
            [C, C, C, C, P],
        ];
        for statuses in cases {
            let steps = all_steps(statuses);
            if let Some(allowed) = sequencer.first_allowed_step(&steps) {
                assert!(
                    sequencer.missing_prerequisites(&steps, allowed).is_empty(),
                    "{allowed} returned with incomplete predecessor for {statuses:?}"
                );
                assert!(!steps.iter().any(|s| s.step_type == allowed && s.is_completed()));
            }
        }
        assert_eq!(sequencer.first_allowed_step(&all_steps([C; 5])), None);
    }

    #[test]
    fn test_optional_step_does_not_gate_later_steps() {
        let config = WorkflowConfig::default();
        let sequencer = Sequencer::new(&config);
        use StepStatus::{Completed as C, Pending as P};
        let steps = all_steps([C, P, P, P, P]);

        assert_eq!(sequencer.first_allowed_step(&steps), Some(StepType::Preparation));
        assert!(sequencer.can_access_step(&steps, StepType::Installation));
        assert!(!sequencer.can_access_step(&steps, StepType::QualityControl));
        let err = sequencer
            .check_prerequisites(&steps, StepType::Finalization)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::PrerequisiteNotMet { ref missing, .. }
                if missing == &vec![StepType::Installation, StepType::QualityControl]
        ));
    }

    #[test]
    fn test_completed_steps_remain_accessible() {
        let config = WorkflowConfig::default();
        let sequencer = Sequencer::new(&config);
        use StepStatus::{Completed as C, Pending as P};
        let steps = all_steps([C, P, P, P, P]);
        assert!(sequencer.can_access_step(&steps, StepType::Inspection));
        assert!(!sequencer.can_access_step(&[], StepType::Inspection));
    }

    #[test]
    fn test_photo_threshold_is_inclusive() {
        let config = WorkflowConfig::default();
        let sequencer = Sequencer::new(&config);
        let rec = record(StepType::Preparation, StepStatus::InProgress, false);

        assert!(matches!(
            sequencer.check_photos(&rec, 1),
            Err(WorkflowError::PhotoRequirementNotMet { required: 2, actual: 1, .. })
        ));
        assert!(sequencer.check_photos(&rec, 2).is_ok());
        assert!(matches!(
            sequencer.check_photos(&rec, 5),
            Err(WorkflowError::PhotoLimitExceeded { allowed: 4, .. })
        ));
    }

    #[test]
    fn test_completed_step_cannot_transition_again() {
        let config = WorkflowConfig::default();
        let sequencer = Sequencer::new(&config);
        let rec = record(StepType::Inspection, StepStatus::Completed, true);
        assert!(matches!(
            sequencer.ensure_transition(&rec, StepStatus::Completed),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        let rec = record(StepType::Inspection, StepStatus::InProgress, true);
        assert!(sequencer.ensure_transition(&rec, StepStatus::InProgress).is_err());
    }

    #[test]
    fn test_quality_control_checklist_must_be_answered() {
        let config = WorkflowConfig::default();
        let sequencer = Sequencer::new(&config);
        let rec = record(StepType::QualityControl, StepStatus::InProgress, true);

        let partial = json!({"checklist": {"edges": true, "bubbles": null}});
        let err = sequencer.validate_completion(&rec, &partial, 2).unwrap_err();
        assert!(matches!(err, WorkflowError::StepValidationFailed { ref reason, .. } if reason.contains("bubbles")));

        let full = json!({"checklist": {"edges": true, "bubbles": false}});
        assert!(sequencer.validate_completion(&rec, &full, 2).is_ok());

        let free_form = json!({"checklist": {"edges": "n/a", "gloss": 4}});
        assert!(sequencer.validate_completion(&rec, &free_form, 2).is_ok());
    }

    #[test]
    fn test_required_fields_and_open_defects_block_completion() {
        let config = WorkflowConfig::default();
        let sequencer = Sequencer::new(&config);
        let rec = record(StepType::Installation, StepStatus::InProgress, true);

        let err = sequencer.validate_completion(&rec, &json!({}), 3).unwrap_err();
        assert!(matches!(err, WorkflowError::StepValidationFailed { ref reason, .. } if reason.contains("zones")));

        let open = json!({"zones": ["hood"], "defects": [{"kind": "bubble", "severity": "low"}]});
        assert!(sequencer.validate_completion(&rec, &open, 3).is_err());

        let accepted = json!({"zones": ["hood"], "defects": [{"kind": "bubble", "accepted": true}]});
        assert!(sequencer.validate_completion(&rec, &accepted, 3).is_ok());
    }
}
