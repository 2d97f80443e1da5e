//! Concept lookup and expansion.

use std::collections::HashMap;

use crate::core::model::{Step, StepId, Suite};

/// Where a concept is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    /// Defining step (the concept head) in the suite arena.
    pub step: StepId,
    pub file_name: String,
}

/// Concept head text to definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptDictionary {
    concepts: HashMap<String, Concept>,
}

impl ConceptDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concept. Returns the previous definition for the same head, if any.
    pub fn add(&mut self, value: impl Into<String>, concept: Concept) -> Option<Concept> {
        self.concepts.insert(value.into(), concept)
    }

    pub fn search(&self, value: &str) -> Option<&Concept> {
        self.concepts.get(value)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

pub fn is_concept(step: &Step) -> bool {
    step.is_concept
}

/// Nested steps of a concept invocation (empty for literal steps).
pub fn body<'a>(suite: &'a Suite, step: &'a Step) -> impl Iterator<Item = &'a Step> + 'a {
    step.concept_steps.iter().map(move |id| suite.step(*id))
}

/// File defining the concept that expanded into `step`.
///
/// `None` for top-level steps, or when the parent's text has no dictionary entry.
pub fn defining_file<'a>(
    suite: &Suite,
    concepts: &'a ConceptDictionary,
    step: &Step,
) -> Option<&'a str> {
    let parent = suite.step(step.parent?);
    concepts
        .search(&parent.value)
        .map(|concept| concept.file_name.as_str())
}
