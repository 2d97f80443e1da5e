//! Visitor that checks every step of a specification against the runner.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::core::aggregate::SpecErrors;
use crate::core::cache::{StepKey, ValidationCache};
use crate::core::concept::{self, ConceptDictionary};
use crate::core::model::{SpecId, Specification, Step, Suite};
use crate::core::outcome::{Outcome, StepValidationError};
use crate::core::traverse::{Node, SpecVisitor, traverse};
use crate::io::runner::{RunnerClient, validate_step};

/// Validates specifications one after another, sharing one cache per run.
pub struct Validator<'a, R: RunnerClient + ?Sized> {
    suite: &'a Suite,
    concepts: &'a ConceptDictionary,
    runner: &'a mut R,
    timeout: Duration,
    cache: ValidationCache,
}

impl<'a, R: RunnerClient + ?Sized> Validator<'a, R> {
    pub fn new(
        suite: &'a Suite,
        concepts: &'a ConceptDictionary,
        runner: &'a mut R,
        timeout: Duration,
    ) -> Self {
        Self {
            suite,
            concepts,
            runner,
            timeout,
            cache: ValidationCache::new(),
        }
    }

    /// Validate `specs` in order. Specs without errors have no entry.
    pub fn validate(&mut self, specs: &[SpecId]) -> SpecErrors {
        let suite = self.suite;
        let mut status = SpecErrors::new();
        for id in specs {
            let errors = self.validate_spec(suite.spec(*id));
            if !errors.is_empty() {
                status.insert(*id, errors);
            }
        }
        status
    }

    #[instrument(skip_all, fields(spec = %spec.file_name))]
    pub fn validate_spec(&mut self, spec: &Specification) -> Vec<StepValidationError> {
        let mut visitor = SpecValidator {
            suite: self.suite,
            concepts: self.concepts,
            runner: &mut *self.runner,
            timeout: self.timeout,
            cache: &mut self.cache,
            spec,
            errors: Vec::new(),
        };
        traverse(self.suite, spec, &mut visitor);
        visitor.errors
    }

    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }
}

struct SpecValidator<'v, R: RunnerClient + ?Sized> {
    suite: &'v Suite,
    concepts: &'v ConceptDictionary,
    runner: &'v mut R,
    timeout: Duration,
    cache: &'v mut ValidationCache,
    spec: &'v Specification,
    errors: Vec<StepValidationError>,
}

impl<R: RunnerClient + ?Sized> SpecVisitor for SpecValidator<'_, R> {
    fn visit(&mut self, node: Node<'_>) {
        match node {
            Node::SpecHeading(_) => self.errors.clear(),
            Node::ContextStep(step) | Node::Step(step) => self.step(step),
            Node::SpecTags(_)
            | Node::DataTable(_)
            | Node::Comment(_)
            | Node::TearDown(_)
            | Node::Scenario(_)
            | Node::ScenarioHeading(_)
            | Node::ScenarioTags(_) => {}
        }
    }
}

impl<R: RunnerClient + ?Sized> SpecValidator<'_, R> {
    fn step(&mut self, step: &Step) {
        if concept::is_concept(step) {
            for child in concept::body(self.suite, step) {
                self.step(child);
            }
            return;
        }

        let key = StepKey::of(step);
        let outcome = match self.cache.lookup(&key) {
            Some(outcome) => {
                debug!(step = %step.value, "validation cache hit");
                outcome.clone()
            }
            None => {
                let outcome = self.query(step);
                self.cache.store(key, outcome.clone());
                outcome
            }
        };

        if let Outcome::Invalid { message, kind } = outcome {
            let file_name = self.attributed_file(step);
            self.errors
                .push(StepValidationError::new(step, message, file_name, kind));
        }
    }

    fn query(&mut self, step: &Step) -> Outcome {
        match validate_step(&mut *self.runner, &step.value, step.param_count(), self.timeout) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(step = %step.value, err = %err, "runner request failed");
                Outcome::failed(err.to_string())
            }
        }
    }

    /// Top-level steps belong to the specification file; expanded steps to the concept's file.
    fn attributed_file(&self, step: &Step) -> String {
        if step.parent.is_none() {
            return self.spec.file_name.clone();
        }
        match concept::defining_file(self.suite, self.concepts, step) {
            Some(file) => file.to_string(),
            None => {
                warn!(step = %step.value, "concept definition not found, using spec file");
                self.spec.file_name.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::build_err_maps;
    use crate::core::outcome::ErrorKind;
    use crate::test_support::{ScriptedResponse, ScriptedRunner, SuiteBuilder};

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn identical_steps_query_runner_once() {
        let mut b = SuiteBuilder::new();
        let spec = b.spec("specs/a.spec");
        for i in 0..3 {
            let scenario = b.scenario(spec, &format!("S{i}"));
            b.scenario_step(scenario, "open {}", &["x"]);
        }
        let (suite, concepts) = b.finish();
        let mut runner = ScriptedRunner::new()
            .respond("open {}", ScriptedResponse::Invalid("STEP_IMPLEMENTATION_NOT_FOUND"));

        let errors = Validator::new(&suite, &concepts, &mut runner, TIMEOUT).validate(&[spec]);

        assert_eq!(runner.requests(), vec![("open {}".to_string(), 1)]);
        let errors = &errors[&spec];
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.message == "Step implementation not found"));
        assert!(errors.iter().all(|e| e.kind == Some(ErrorKind::StepImplementationNotFound)));
    }

    #[test]
    fn cache_is_shared_across_specs() {
        let mut b = SuiteBuilder::new();
        let first = b.spec("specs/a.spec");
        b.context_step(first, "open app", &[]);
        let second = b.spec("specs/b.spec");
        b.context_step(second, "open app", &[]);
        let (suite, concepts) = b.finish();
        let mut runner = ScriptedRunner::new();

        let mut validator = Validator::new(&suite, &concepts, &mut runner, TIMEOUT);
        let errors = validator.validate(&[first, second]);
        assert_eq!(validator.cache().len(), 1);

        assert!(errors.is_empty());
        assert_eq!(runner.requests().len(), 1);
    }

    #[test]
    fn concept_failures_point_at_concept_file() {
        let mut b = SuiteBuilder::new();
        b.define_concept("concepts/login.cpt", "login", &["open login page"]);
        let first = b.spec("specs/a.spec");
        let scenario = b.scenario(first, "A");
        b.scenario_concept(scenario, "login");
        let second = b.spec("specs/b.spec");
        let scenario = b.scenario(second, "B");
        b.scenario_concept(scenario, "login");
        let (suite, concepts) = b.finish();
        let mut runner = ScriptedRunner::new()
            .respond("open login page", ScriptedResponse::Invalid("STEP_IMPLEMENTATION_NOT_FOUND"));

        let errors =
            Validator::new(&suite, &concepts, &mut runner, TIMEOUT).validate(&[first, second]);

        assert_eq!(errors[&first][0].file_name, "concepts/login.cpt");
        assert_eq!(errors[&second][0].file_name, "concepts/login.cpt");
        assert_ne!(errors[&first][0].step, errors[&second][0].step);
        assert_eq!(runner.requests().len(), 1);
    }

    #[test]
    fn nested_concepts_expand_to_leaf_steps() {
        let mut b = SuiteBuilder::new();
        b.define_concept("concepts/form.cpt", "fill form", &["type name", "press submit"]);
        b.define_nested_concept("concepts/signup.cpt", "sign up", "fill form");
        let spec = b.spec("specs/a.spec");
        let scenario = b.scenario(spec, "A");
        b.scenario_concept(scenario, "sign up");
        let (suite, concepts) = b.finish();
        let mut runner = ScriptedRunner::new()
            .respond("press submit", ScriptedResponse::Invalid("DUPLICATE_STEP_IMPLEMENTATION"));

        let errors = Validator::new(&suite, &concepts, &mut runner, TIMEOUT).validate(&[spec]);

        assert_eq!(
            runner.requests(),
            vec![("type name".to_string(), 0), ("press submit".to_string(), 0)]
        );
        let err = &errors[&spec][0];
        assert_eq!(err.file_name, "concepts/form.cpt");
        assert_eq!(err.message, "Duplicate step implementation");
    }

    #[test]
    fn transport_failures_become_step_errors() {
        let mut b = SuiteBuilder::new();
        let spec = b.spec("specs/a.spec");
        let scenario = b.scenario(spec, "A");
        b.scenario_step(scenario, "slow step", &[]);
        b.scenario_step(scenario, "weird step", &[]);
        b.scenario_step(scenario, "fine step", &[]);
        let (suite, concepts) = b.finish();
        let mut runner = ScriptedRunner::new()
            .respond("slow step", ScriptedResponse::Timeout)
            .respond("weird step", ScriptedResponse::WrongMessageType);

        let errors = Validator::new(&suite, &concepts, &mut runner, TIMEOUT).validate(&[spec]);

        let errors = &errors[&spec];
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Request timed out after 1000ms");
        assert_eq!(errors[0].kind, None);
        assert_eq!(errors[0].file_name, "specs/a.spec");
        assert_eq!(errors[1].kind, Some(ErrorKind::InvalidResponse));
        assert_eq!(runner.requests().len(), 3);
    }

    #[test]
    fn failing_context_concept_reaches_spec_and_every_clean_scenario() {
        let mut b = SuiteBuilder::new();
        b.define_concept("concepts/setup.cpt", "prepare store", &["seed catalog", "start cart"]);
        let spec = b.spec("specs/shop.spec");
        b.context_concept(spec, "prepare store");
        let browse = b.scenario(spec, "Browse");
        b.scenario_step(browse, "search", &[]);
        let pay = b.scenario(spec, "Pay");
        b.scenario_step(pay, "pay", &[]);
        let (suite, concepts) = b.finish();
        let mut runner = ScriptedRunner::new()
            .respond("start cart", ScriptedResponse::Invalid("STEP_IMPLEMENTATION_NOT_FOUND"))
            .respond("pay", ScriptedResponse::Invalid("STEP_IMPLEMENTATION_NOT_FOUND"));

        let errors = Validator::new(&suite, &concepts, &mut runner, TIMEOUT).validate(&[spec]);
        let maps = build_err_maps(&suite, &errors);

        let context_err = errors[&spec]
            .iter()
            .find(|e| e.line_text == "start cart")
            .cloned()
            .expect("context concept error");
        assert_eq!(context_err.file_name, "concepts/setup.cpt");
        assert_eq!(maps.spec_errs[&spec], vec![context_err.clone()]);
        assert_eq!(maps.scenario_errs[&browse], vec![context_err]);
        let pay_errs: Vec<&str> = maps.scenario_errs[&pay]
            .iter()
            .map(|e| e.line_text.as_str())
            .collect();
        assert_eq!(pay_errs, vec!["pay"]);
    }

    #[test]
    fn teardown_steps_are_validated() {
        let mut b = SuiteBuilder::new();
        let spec = b.spec("specs/a.spec");
        b.tear_down(spec);
        b.context_step(spec, "close app", &[]);
        let (suite, concepts) = b.finish();
        let mut runner = ScriptedRunner::new()
            .respond("close app", ScriptedResponse::Invalid("STEP_IMPLEMENTATION_NOT_FOUND"));

        let errors = Validator::new(&suite, &concepts, &mut runner, TIMEOUT).validate(&[spec]);

        assert_eq!(errors[&spec].len(), 1);
        assert_eq!(suite.spec(spec).tear_down_steps, vec![errors[&spec][0].step]);
    }
}
