//! Static definition of the PPF steps.
//!
//! The catalog is the single source of truth for step ordering, mandatory
//! flags and photo requirements. It lives inside [`crate::WorkflowConfig`]
//! and is never duplicated elsewhere.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, WorkflowError},
    models::StepType,
};

/// Requirements of one catalog step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDefinition {
    pub step_type: StepType,
    pub is_mandatory: bool,
    pub requires_photos: bool,
    #[serde(default)]
    pub min_photos_required: u32,
    pub max_photos_allowed: u32,
    /// Completed records of this step are flagged for supervisor review
    #[serde(default)]
    pub requires_supervisor_approval: bool,
    /// Keys that must be present in `collected_data` on completion
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Weight of this step's quality score in the aggregated score
    #[serde(default = "default_weight")]
    pub quality_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl StepDefinition {
    fn new(step_type: StepType, is_mandatory: bool, min: u32, max: u32) -> Self {
        Self {
            step_type,
            is_mandatory,
            requires_photos: min > 0,
            min_photos_required: min,
            max_photos_allowed: max,
            requires_supervisor_approval: false,
            required_fields: Vec::new(),
            quality_weight: 1.0,
        }
    }

    fn with_required_fields(mut self, fields: &[&str]) -> Self {
        self.required_fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    fn with_weight(mut self, weight: f64) -> Self {
        self.quality_weight = weight;
        self
    }
}

/// Ordered list of step definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct StepCatalog(Vec<StepDefinition>);

impl Default for StepCatalog {
    fn default() -> Self {
        Self(vec![
            StepDefinition::new(StepType::Inspection, true, 4, 20)
                .with_required_fields(&["checklist"]),
            StepDefinition::new(StepType::Preparation, false, 0, 10),
            StepDefinition::new(StepType::Installation, true, 3, 20)
                .with_required_fields(&["zones"])
                .with_weight(2.0),
            StepDefinition::new(StepType::QualityControl, true, 2, 15)
                .with_required_fields(&["checklist"])
                .with_weight(2.0),
            StepDefinition::new(StepType::Finalization, true, 2, 10),
        ])
    }
}

impl StepCatalog {
    pub fn new(definitions: Vec<StepDefinition>) -> Result<Self> {
        let catalog = Self(definitions);
        catalog.validate()?;
        Ok(catalog)
    }

    /// Checks ordering and photo bounds.
    pub fn validate(&self) -> Result<()> {
        let Some(last) = self.0.last() else {
            return Err(config_error("step catalog is empty"));
        };
        if last.step_type != StepType::Finalization {
            return Err(config_error("the finalization step must close the catalog"));
        }
        for pair in self.0.windows(2) {
            if pair[0].step_type >= pair[1].step_type {
                return Err(config_error(format!(
                    "step '{}' is out of order or duplicated",
                    pair[1].step_type
                )));
            }
        }
        for def in &self.0 {
            if def.min_photos_required > def.max_photos_allowed {
                return Err(config_error(format!(
                    "step '{}' requires {} photos but allows only {}",
                    def.step_type, def.min_photos_required, def.max_photos_allowed
                )));
            }
            if def.requires_photos && def.min_photos_required == 0 {
                return Err(config_error(format!(
                    "step '{}' requires photos but has no minimum",
                    def.step_type
                )));
            }
            if !def.quality_weight.is_finite() || def.quality_weight < 0.0 {
                return Err(config_error(format!(
                    "step '{}' has an invalid quality weight",
                    def.step_type
                )));
            }
        }
        Ok(())
    }

    /// Definition lookup by type.
    pub fn get(&self, step_type: StepType) -> Option<&StepDefinition> {
        self.0.iter().find(|d| d.step_type == step_type)
    }

    /// Definition lookup by order index.
    pub fn by_index(&self, index: usize) -> Option<&StepDefinition> {
        self.0.get(index)
    }

    /// Order index of a step type within this catalog.
    pub fn position_of(&self, step_type: StepType) -> Option<usize> {
        self.0.iter().position(|d| d.step_type == step_type)
    }

    /// The step whose completion finalizes the intervention.
    pub fn terminal(&self) -> StepType {
        self.0
            .last()
            .map_or(StepType::Finalization, |d| d.step_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn config_error(message: impl Into<String>) -> WorkflowError {
    WorkflowError::Configuration {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid_and_ordered() {
        let catalog = StepCatalog::default();
        catalog.validate().expect("default catalog should validate");
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.terminal(), StepType::Finalization);
        assert_eq!(catalog.position_of(StepType::Installation), Some(2));
        assert!(!catalog.get(StepType::Preparation).unwrap().is_mandatory);
    }

    #[test]
    fn test_catalog_rejects_out_of_order_steps() {
        let mut defs: Vec<StepDefinition> = StepCatalog::default().iter().cloned().collect();
        defs.swap(0, 1);
        assert!(matches!(
            StepCatalog::new(defs),
            Err(WorkflowError::Configuration { .. })
        ));
    }

    #[test]
    fn test_catalog_requires_terminal_step_last() {
        let defs = vec![StepDefinition::new(StepType::Inspection, true, 1, 4)];
        assert!(StepCatalog::new(defs).is_err());
    }

    #[test]
    fn test_catalog_rejects_inverted_photo_bounds() {
        let defs = vec![
            StepDefinition::new(StepType::Inspection, true, 5, 2),
            StepDefinition::new(StepType::Finalization, true, 1, 2),
        ];
        assert!(StepCatalog::new(defs).is_err());
    }

    #[test]
    fn test_three_step_catalog_from_json() {
        let json = r#"[
            {"step_type": "inspection", "is_mandatory": true, "requires_photos": true, "min_photos_required": 3, "max_photos_allowed": 10},
            {"step_type": "installation", "is_mandatory": true, "requires_photos": true, "min_photos_required": 3, "max_photos_allowed": 10},
            {"step_type": "finalization", "is_mandatory": true, "requires_photos": false, "max_photos_allowed": 5}
        ]"#;
        let catalog: StepCatalog = serde_json::from_str(json).unwrap();
        catalog.validate().unwrap();
        assert_eq!(catalog.by_index(1).unwrap().step_type, StepType::Installation);
        assert_eq!(catalog.by_index(2).unwrap().quality_weight, 1.0);
    }
}
