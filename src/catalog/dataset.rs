//! Immutable plan datasets used to seed a [`PlanCatalog`](super::PlanCatalog).

use super::plan::Plan;
use super::validation::validate_plan;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUNDLED_PLANS: &str = include_str!("default_plans.json");

/// A validated set of plan definitions, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDataset {
    plans: Vec<Plan>,
}

impl PlanDataset {
    /// The dataset shipped with the crate (free, starter, professional, enterprise).
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_PLANS)
    }

    /// Parse and validate a dataset from a JSON document of the form `{"plans": [...]}`.
    ///
    /// Each plan must list all five `max_*` limits; `-1` marks unlimited. A missing
    /// or unknown limit key fails the load.
    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: PlanDataset = serde_json::from_str(json)?;
        Self::from_plans(dataset.plans)
    }

    /// Load a dataset from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("failed to read plan dataset {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Build a dataset from plans, validating each and rejecting duplicate ids.
    ///
    /// Plans without a version are stamped as version 1.
    pub fn from_plans(plans: Vec<Plan>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut validated = Vec::with_capacity(plans.len());

        for mut plan in plans {
            validate_plan(&plan)?;
            if !seen.insert(plan.id.clone()) {
                return Err(EngineError::validation(format!(
                    "duplicate plan id '{}' in dataset",
                    plan.id
                )));
            }
            if plan.version == 0 {
                plan.version = 1;
            }
            validated.push(plan);
        }

        Ok(Self { plans: validated })
    }

    /// The plans in this dataset.
    #[must_use]
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Number of plans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub(crate) fn into_plans(self) -> Vec<Plan> {
        self.plans
    }
}
