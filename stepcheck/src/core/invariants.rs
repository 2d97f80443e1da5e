//! Semantic invariants not expressible via JSON Schema.

use crate::core::concept::ConceptDictionary;
use crate::core::model::Suite;

/// Check invariants the validator relies on:
/// - literal steps have no concept body
/// - body steps point back to the concept that owns them
/// - body steps precede their concept in the arena (expansion terminates)
/// - every concept invocation has a dictionary entry
pub fn validate_invariants(suite: &Suite, concepts: &ConceptDictionary) -> Vec<String> {
    let mut errors = Vec::new();
    for step in suite.steps() {
        let location = format!("step {} ('{}', line {})", step.id.0, step.value, step.line_no);

        if !step.is_concept {
            if !step.concept_steps.is_empty() {
                errors.push(format!("{location}: literal step has concept steps"));
            }
            continue;
        }

        if concepts.search(&step.value).is_none() {
            errors.push(format!("{location}: no concept definition for '{}'", step.value));
        }

        for child in &step.concept_steps {
            if child.0 >= suite.steps().len() {
                errors.push(format!("{location}: unknown concept step id {}", child.0));
                continue;
            }
            if *child >= step.id {
                errors.push(format!(
                    "{location}: concept step id {} does not precede its concept",
                    child.0
                ));
            }
            if suite.step(*child).parent != Some(step.id) {
                errors.push(format!(
                    "{location}: concept step id {} has a different parent",
                    child.0
                ));
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::concept::Concept;

    #[test]
    fn reports_missing_concept_definition() {
        let mut suite = Suite::new();
        let leaf = suite.new_step("a", "a", 2, Vec::new());
        suite.new_concept_step("undefined", "undefined", 1, Vec::new(), vec![leaf]);

        let errors = validate_invariants(&suite, &ConceptDictionary::new());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("no concept definition for 'undefined'"));
    }

    #[test]
    fn accepts_defined_concepts() {
        let mut suite = Suite::new();
        let leaf = suite.new_step("a", "a", 2, Vec::new());
        let head = suite.new_concept_step("login", "login", 1, Vec::new(), vec![leaf]);
        let mut concepts = ConceptDictionary::new();
        concepts.add(
            "login",
            Concept {
                step: head,
                file_name: "concepts/login.cpt".to_string(),
            },
        );

        assert!(validate_invariants(&suite, &concepts).is_empty());
    }

    #[test]
    fn reports_step_adopted_by_two_concepts() {
        let mut suite = Suite::new();
        let leaf = suite.new_step("a", "a", 2, Vec::new());
        let first = suite.new_concept_step("one", "one", 1, Vec::new(), vec![leaf]);
        let second = suite.new_concept_step("two", "two", 5, Vec::new(), vec![leaf]);
        let mut concepts = ConceptDictionary::new();
        for (value, step) in [("one", first), ("two", second)] {
            concepts.add(
                value,
                Concept {
                    step,
                    file_name: "concepts/c.cpt".to_string(),
                },
            );
        }

        let errors = validate_invariants(&suite, &concepts);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("has a different parent"));
    }
}
