//! Collection wrappers with empty-collection handling.

use std::fmt;

use crate::models::{Intervention, StepPhoto, StepRecord, UploadItem};

/// Newtype wrapper for listing interventions.
///
/// # Examples
///
/// ```rust
/// use ppf_core::display::Interventions;
///
/// let empty = Interventions(vec![]);
/// assert_eq!(empty.to_string(), "No interventions found.\n");
/// ```
pub struct Interventions(pub Vec<Intervention>);

impl Interventions {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Interventions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No interventions found.");
        }
        for intervention in &self.0 {
            write!(
                f,
                "- {}. {} ({}, {:.0}%, {})",
                intervention.id,
                intervention.task_ref,
                intervention.status,
                intervention.progress_percentage,
                intervention.technician_id
            )?;
            if intervention.requires_supervisor_approval {
                write!(f, " [approval required]")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Newtype wrapper for the steps of one intervention.
pub struct Steps(pub Vec<StepRecord>);

impl fmt::Display for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No steps found.");
        }
        for step in &self.0 {
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Newtype wrapper for the upload list.
pub struct Uploads(pub Vec<UploadItem>);

impl fmt::Display for Uploads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No uploads.");
        }
        for item in &self.0 {
            write!(f, "- {item}")?;
        }
        Ok(())
    }
}

/// Newtype wrapper for the photos of a step.
pub struct Photos(pub Vec<StepPhoto>);

impl fmt::Display for Photos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No photos attached.");
        }
        for photo in &self.0 {
            write!(f, "{photo}")?;
        }
        Ok(())
    }
}
