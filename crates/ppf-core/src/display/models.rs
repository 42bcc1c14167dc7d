//! Markdown display for the domain models.

use std::fmt;

use serde_json::Value;

use super::datetime::{LocalDateTime, MaybeDateTime};
use crate::{
    aggregator::{ApprovalReason, CompletionMetrics},
    models::{Intervention, InterventionProgress, StepPhoto, StepRecord, UploadItem, UploadStatus},
};

impl fmt::Display for Intervention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}. {}", self.id, self.task_ref)?;
        writeln!(f)?;

        writeln!(f, "- Status: {}", self.status)?;
        writeln!(f, "- Technician: {}", self.technician_id)?;
        writeln!(f, "- Progress: {:.0}%", self.progress_percentage)?;
        if self.requires_supervisor_approval {
            writeln!(f, "- Supervisor approval: required")?;
        }
        writeln!(f, "- Created: {}", LocalDateTime(&self.created_at))?;
        if let Some(started) = &self.started_at {
            writeln!(f, "- Started: {}", LocalDateTime(started))?;
        }
        if let Some(finalized) = &self.finalized_at {
            writeln!(f, "- Finalized: {}", LocalDateTime(finalized))?;
        }

        if let Some(metrics) = &self.metrics {
            writeln!(f)?;
            write!(f, "{metrics}")?;
        }

        if self.steps.is_empty() {
            writeln!(f, "\nNo steps in this intervention.")?;
        } else {
            writeln!(f, "\n## Steps")?;
            writeln!(f)?;
            for step in &self.steps {
                write!(f, "{step}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "### {}. {} ({})",
            self.order + 1,
            self.step_type.label(),
            self.status.with_icon()
        )?;
        writeln!(f)?;

        let mandatory = if self.is_mandatory { "mandatory" } else { "optional" };
        if self.requires_photos {
            writeln!(
                f,
                "- {mandatory}, photos {}/{} (min {})",
                self.photo_count(),
                self.max_photos_allowed,
                self.min_photos_required
            )?;
        } else {
            writeln!(f, "- {mandatory}, {} photo(s)", self.photo_count())?;
        }
        if let Some(score) = self.quality_score {
            writeln!(f, "- Quality score: {score:.1}")?;
        }
        if let Some(passed) = self.quality_check_passed {
            writeln!(f, "- Quality check: {}", if passed { "passed" } else { "failed" })?;
        }
        if self.requires_supervisor_approval {
            match &self.approved_by {
                Some(approver) => writeln!(
                    f,
                    "- Approved by {approver} on {}",
                    MaybeDateTime(self.approved_at.as_ref())
                )?,
                None => writeln!(f, "- Awaiting supervisor approval")?,
            }
        }
        if let Some(completed) = &self.completed_at {
            writeln!(f, "- Completed: {}", LocalDateTime(completed))?;
        }
        writeln!(f)?;

        let checklist = self.checklist();
        if !checklist.is_empty() {
            writeln!(f, "#### Checklist")?;
            writeln!(f)?;
            for (item, answer) in checklist {
                match answer {
                    Value::Bool(true) => writeln!(f, "- [x] {item}")?,
                    Value::Bool(false) => writeln!(f, "- [ ] {item}")?,
                    Value::Null => writeln!(f, "- [?] {item}")?,
                    Value::String(text) => writeln!(f, "- [-] {item}: {text}")?,
                    other => writeln!(f, "- [-] {item}: {other}")?,
                }
            }
            writeln!(f)?;
        }

        if let Some(notes) = &self.notes {
            writeln!(f, "#### Notes")?;
            writeln!(f)?;
            writeln!(f, "{notes}")?;
            writeln!(f)?;
        }

        if !self.issues.is_empty() {
            writeln!(f, "#### Issues")?;
            writeln!(f)?;
            for issue in &self.issues {
                writeln!(f, "- {issue}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for InterventionProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Intervention {} is {}: {:.0}% complete",
            self.intervention_id, self.status, self.progress_percentage
        )?;
        writeln!(f)?;
        for step in &self.steps {
            writeln!(
                f,
                "- {} ({}), {} photo(s)",
                step.step_type.label(),
                step.status.with_icon(),
                step.photo_count()
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ApprovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalReason::StepFlagged { step } => write!(f, "step '{step}' is flagged for approval"),
            ApprovalReason::LowQualityScore { score, threshold } => {
                write!(f, "quality score {score:.1} is below {threshold:.1}")
            }
            ApprovalReason::SevereDefect { step, kind, severity } => {
                write!(f, "unresolved {severity} defect '{kind}' in step '{step}'")
            }
        }
    }
}

impl fmt::Display for CompletionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Completion")?;
        writeln!(f)?;
        writeln!(f, "- Steps: {}/{}", self.completed_steps, self.total_steps)?;
        writeln!(
            f,
            "- Checklist: {}/{} ({:.0}%)",
            self.checklist_completed,
            self.checklist_total,
            self.checklist_completion_ratio() * 100.0
        )?;
        writeln!(f, "- Photos: {}", self.total_photos)?;
        match self.quality_score {
            Some(score) => writeln!(f, "- Quality score: {score:.1}")?,
            None => writeln!(f, "- Quality score: n/a")?,
        }

        if !self.unresolved_defects.is_empty() {
            writeln!(f, "- Unresolved defects:")?;
            for unresolved in &self.unresolved_defects {
                writeln!(
                    f,
                    "  - {} ({}) in {}",
                    unresolved.defect.kind, unresolved.defect.severity, unresolved.step
                )?;
            }
        }

        if self.requires_supervisor_approval {
            writeln!(f, "- Supervisor approval required:")?;
            for reason in &self.approval_reasons {
                writeln!(f, "  - {reason}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for UploadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. {} [{}] {} / {}",
            self.id,
            self.source.display(),
            self.status,
            self.intervention_id,
            self.step_type
        )?;
        match self.status {
            UploadStatus::Queued | UploadStatus::Uploading => write!(f, " ({}%)", self.progress)?,
            UploadStatus::Completed => {
                if let Some(url) = &self.url {
                    write!(f, " -> {url}")?;
                }
            }
            UploadStatus::Error => {
                if let Some(error) = &self.error {
                    write!(f, ": {error}")?;
                }
            }
        }
        writeln!(f)
    }
}

impl fmt::Display for StepPhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {} ({}x{}", self.url, self.metadata.width, self.metadata.height)?;
        if let Some(angle) = &self.metadata.tags.angle {
            write!(f, ", {angle}")?;
        }
        if let Some(location) = &self.metadata.location {
            write!(f, ", {:.5},{:.5}", location.latitude, location.longitude)?;
        }
        writeln!(f, ") {}", LocalDateTime(&self.metadata.captured_at))
    }
}
