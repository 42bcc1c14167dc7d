//! Display for operation outcomes.

use std::fmt;

use crate::workflow::{DraftSaved, Finalized, PhotoAttached, StepAdvanced};

impl fmt::Display for DraftSaved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.written {
            writeln!(
                f,
                "Draft saved for step '{}' (revision {})",
                self.step.step_type, self.step.revision
            )
        } else {
            writeln!(f, "Draft for step '{}' unchanged, nothing written", self.step.step_type)
        }
    }
}

impl fmt::Display for StepAdvanced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Completed step '{}'", self.step.step_type.label())?;
        writeln!(f)?;
        writeln!(f, "- Progress: {:.0}%", self.progress_percentage)?;
        match self.next_step {
            Some(next) => writeln!(f, "- Next step: {}", next.label())?,
            None => writeln!(f, "- All steps completed")?,
        }
        if let Some(metrics) = &self.metrics {
            writeln!(f)?;
            write!(f, "{metrics}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Finalized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Finalized intervention {}", self.intervention.id)?;
        writeln!(f)?;
        write!(f, "{}", self.metrics)
    }
}

impl fmt::Display for PhotoAttached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Attached photo {} to step '{}' ({} photo(s))",
            self.photo.id,
            self.step.step_type,
            self.step.photo_count()
        )?;
        write!(f, "{}", self.photo)
    }
}
