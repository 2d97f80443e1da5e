//! Roll step-level validation errors up to scenarios and specifications.
//!
//! Rules:
//! - every error is keyed by its step;
//! - a scenario collects the errors of its steps, concept bodies included;
//! - when every scenario of a spec failed, the first scenario's errors become
//!   the specification's errors;
//! - context and teardown failures belong to the specification and to every scenario
//!   that has no error yet.

use std::collections::BTreeMap;

use crate::core::model::{ScenarioId, SpecId, Specification, StepId, Suite};
use crate::core::outcome::StepValidationError;

/// Errors produced by the step validator, per specification, in traversal order.
pub type SpecErrors = BTreeMap<SpecId, Vec<StepValidationError>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrMaps {
    pub spec_errs: BTreeMap<SpecId, Vec<StepValidationError>>,
    pub scenario_errs: BTreeMap<ScenarioId, Vec<StepValidationError>>,
    pub step_errs: BTreeMap<StepId, StepValidationError>,
}

impl ValidationErrMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.step_errs.is_empty()
    }
}

/// Build the three error views from per-spec step errors.
pub fn build_err_maps(suite: &Suite, errors: &SpecErrors) -> ValidationErrMaps {
    let mut maps = ValidationErrMaps::new();
    for (spec_id, spec_errors) in errors {
        for err in spec_errors {
            maps.step_errs.insert(err.step, err.clone());
        }

        let spec = suite.spec(*spec_id);
        let mut skipped = 0;
        for scenario in &spec.scenarios {
            fill_scenario_errors(suite, &mut maps, *scenario, &suite.scenario(*scenario).steps);
            if maps.scenario_errs.contains_key(scenario) {
                skipped += 1;
            }
        }
        if !spec.scenarios.is_empty() && skipped == spec.scenarios.len() {
            let first = maps
                .scenario_errs
                .get(&spec.scenarios[0])
                .cloned()
                .unwrap_or_default();
            maps.spec_errs.entry(*spec_id).or_default().extend(first);
        }

        fill_spec_errors(suite, &mut maps, spec, &spec.contexts);
        fill_spec_errors(suite, &mut maps, spec, &spec.tear_down_steps);
    }
    maps
}

fn fill_scenario_errors(
    suite: &Suite,
    maps: &mut ValidationErrMaps,
    scenario: ScenarioId,
    steps: &[StepId],
) {
    for id in steps {
        let step = suite.step(*id);
        if step.is_concept {
            fill_scenario_errors(suite, maps, scenario, &step.concept_steps);
        }
        if let Some(err) = maps.step_errs.get(id) {
            let err = err.clone();
            maps.scenario_errs.entry(scenario).or_default().push(err);
        }
    }
}

fn fill_spec_errors(
    suite: &Suite,
    maps: &mut ValidationErrMaps,
    spec: &Specification,
    steps: &[StepId],
) {
    for id in steps {
        let step = suite.step(*id);
        if step.is_concept {
            fill_spec_errors(suite, maps, spec, &step.concept_steps);
        }
        let Some(err) = maps.step_errs.get(id).cloned() else {
            continue;
        };
        maps.spec_errs.entry(spec.id).or_default().push(err.clone());
        for scenario in &spec.scenarios {
            maps.scenario_errs
                .entry(*scenario)
                .or_insert_with(|| vec![err.clone()]);
        }
    }
}
