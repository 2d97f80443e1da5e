//! Per-run memo of validation outcomes.

use std::collections::HashMap;

use crate::core::model::Step;
use crate::core::outcome::Outcome;

/// Identity of a step for validation purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepKey {
    pub value: String,
    pub param_count: usize,
}

impl StepKey {
    pub fn of(step: &Step) -> Self {
        Self {
            value: step.value.clone(),
            param_count: step.param_count(),
        }
    }
}

/// Outcomes already obtained from the runner during this run.
#[derive(Debug, Default)]
pub struct ValidationCache {
    entries: HashMap<StepKey, Outcome>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &StepKey) -> Option<&Outcome> {
        self.entries.get(key)
    }

    pub fn store(&mut self, key: StepKey, outcome: Outcome) {
        self.entries.insert(key, outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
