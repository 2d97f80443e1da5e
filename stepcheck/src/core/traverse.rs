//! Ordered traversal of a specification.
//!
//! Every node kind is a variant of [`Node`]; visitors implement a single
//! [`SpecVisitor::visit`] and match exhaustively.

use crate::core::model::{
    Comment, Heading, Item, Scenario, Specification, Step, Suite, Table, Tags, TearDown,
};

/// A node reached during traversal.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    SpecHeading(&'a Heading),
    SpecTags(&'a Tags),
    DataTable(&'a Table),
    Comment(&'a Comment),
    /// Spec-level step. Steps after the teardown marker arrive here too.
    ContextStep(&'a Step),
    TearDown(&'a TearDown),
    Scenario(&'a Scenario),
    ScenarioHeading(&'a Heading),
    ScenarioTags(&'a Tags),
    Step(&'a Step),
}

pub trait SpecVisitor {
    fn visit(&mut self, node: Node<'_>);
}

/// Walk `spec` in document order: heading, then items, descending into scenarios.
pub fn traverse<V: SpecVisitor + ?Sized>(suite: &Suite, spec: &Specification, visitor: &mut V) {
    visitor.visit(Node::SpecHeading(&spec.heading));
    for item in &spec.items {
        match item {
            Item::Comment(comment) => visitor.visit(Node::Comment(comment)),
            Item::Tags(tags) => visitor.visit(Node::SpecTags(tags)),
            Item::Table(table) => visitor.visit(Node::DataTable(table)),
            Item::Step(id) => visitor.visit(Node::ContextStep(suite.step(*id))),
            Item::TearDown(tear_down) => visitor.visit(Node::TearDown(tear_down)),
            Item::Scenario(id) => traverse_scenario(suite, suite.scenario(*id), visitor),
        }
    }
}

fn traverse_scenario<V: SpecVisitor + ?Sized>(suite: &Suite, scenario: &Scenario, visitor: &mut V) {
    visitor.visit(Node::Scenario(scenario));
    visitor.visit(Node::ScenarioHeading(&scenario.heading));
    for item in &scenario.items {
        match item {
            Item::Comment(comment) => visitor.visit(Node::Comment(comment)),
            Item::Tags(tags) => visitor.visit(Node::ScenarioTags(tags)),
            Item::Table(table) => visitor.visit(Node::DataTable(table)),
            Item::Step(id) => visitor.visit(Node::Step(suite.step(*id))),
            Item::TearDown(tear_down) => visitor.visit(Node::TearDown(tear_down)),
            // Scenarios do not nest.
            Item::Scenario(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl SpecVisitor for Recorder {
        fn visit(&mut self, node: Node<'_>) {
            let event = match node {
                Node::SpecHeading(h) => format!("spec:{}", h.text),
                Node::SpecTags(t) => format!("spec-tags:{}", t.values.join(",")),
                Node::DataTable(_) => "table".to_string(),
                Node::Comment(c) => format!("comment:{}", c.text),
                Node::ContextStep(s) => format!("context:{}", s.value),
                Node::TearDown(_) => "teardown".to_string(),
                Node::Scenario(_) => "scenario".to_string(),
                Node::ScenarioHeading(h) => format!("scenario-heading:{}", h.text),
                Node::ScenarioTags(t) => format!("scenario-tags:{}", t.values.join(",")),
                Node::Step(s) => format!("step:{}", s.value),
            };
            self.events.push(event);
        }
    }

    #[test]
    fn traverse_visits_items_in_document_order() {
        let mut suite = Suite::new();
        let spec = suite.add_spec(
            "specs/order.spec",
            Heading {
                text: "Order".to_string(),
                line_no: 1,
            },
        );
        suite.push_spec_item(
            spec,
            Item::Tags(Tags {
                values: vec!["smoke".to_string()],
                line_no: 2,
            }),
        );
        let context = suite.new_step("open app", "open app", 3, Vec::new());
        suite.push_context_step(spec, context);
        let scenario = suite.add_scenario(
            spec,
            Heading {
                text: "Buy".to_string(),
                line_no: 5,
            },
        );
        suite.push_scenario_item(
            scenario,
            Item::Tags(Tags {
                values: vec!["cart".to_string()],
                line_no: 6,
            }),
        );
        let step = suite.new_step("add item", "add item", 7, Vec::new());
        suite.push_scenario_step(scenario, step);
        suite.push_spec_item(
            spec,
            Item::TearDown(TearDown {
                text: "___".to_string(),
                line_no: 9,
            }),
        );
        let close = suite.new_step("close app", "close app", 10, Vec::new());
        suite.push_context_step(spec, close);

        let mut recorder = Recorder::default();
        traverse(&suite, suite.spec(spec), &mut recorder);

        assert_eq!(
            recorder.events,
            vec![
                "spec:Order",
                "spec-tags:smoke",
                "context:open app",
                "scenario",
                "scenario-heading:Buy",
                "scenario-tags:cart",
                "step:add item",
                "teardown",
                "context:close app",
            ]
        );
    }
}
