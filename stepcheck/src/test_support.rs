//! Test-only helpers: suite builders, a scripted runner and temp projects.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::concept::{Concept, ConceptDictionary};
use crate::core::model::{Heading, Item, ScenarioId, SpecId, StepId, Suite, TearDown};
use crate::io::config::{CONFIG_FILE_NAME, StepcheckConfig, write_config};
use crate::io::protocol::{Message, StepValidateResponse};
use crate::io::runner::{RunnerClient, TransportError};
use crate::io::suite_store::{ParseResult, ParsedSuite};

enum TemplateStep {
    Literal(String),
    Concept(String),
}

struct ConceptTemplate {
    file_name: String,
    body: Vec<TemplateStep>,
}

/// Builds a [`Suite`] with deterministic line numbers.
///
/// Concepts are expanded into fresh steps at every call site, the way a parser
/// would.
#[derive(Default)]
pub struct SuiteBuilder {
    suite: Suite,
    concepts: ConceptDictionary,
    templates: HashMap<String, ConceptTemplate>,
    next_line: usize,
}

impl SuiteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self) -> usize {
        self.next_line += 1;
        self.next_line
    }

    fn heading(&mut self, text: &str) -> Heading {
        Heading {
            text: text.to_string(),
            line_no: self.line(),
        }
    }

    fn literal(&mut self, value: &str, args: &[&str]) -> StepId {
        let line_no = self.line();
        let line_text = if args.is_empty() {
            value.to_string()
        } else {
            format!("{value} {}", args.join(" "))
        };
        let args = args.iter().map(|arg| arg.to_string()).collect();
        self.suite.new_step(value, line_text, line_no, args)
    }

    fn instantiate(&mut self, head: &str) -> StepId {
        let template = self
            .templates
            .get(head)
            .unwrap_or_else(|| panic!("concept '{head}' not defined"));
        let body: Vec<(bool, String)> = template
            .body
            .iter()
            .map(|step| match step {
                TemplateStep::Literal(value) => (false, value.clone()),
                TemplateStep::Concept(value) => (true, value.clone()),
            })
            .collect();
        let ids = body
            .iter()
            .map(|(is_concept, value)| {
                if *is_concept {
                    self.instantiate(value)
                } else {
                    self.literal(value, &[])
                }
            })
            .collect();
        let line_no = self.line();
        self.suite.new_concept_step(head, head, line_no, Vec::new(), ids)
    }

    fn register(&mut self, file_name: &str, head: &str, body: Vec<TemplateStep>) {
        self.templates.insert(
            head.to_string(),
            ConceptTemplate {
                file_name: file_name.to_string(),
                body,
            },
        );
        let step = self.instantiate(head);
        let file_name = self.templates[head].file_name.clone();
        self.concepts.add(head, Concept { step, file_name });
    }

    /// Define a concept whose body is literal steps.
    pub fn define_concept(&mut self, file_name: &str, head: &str, body: &[&str]) {
        let body = body
            .iter()
            .map(|value| TemplateStep::Literal(value.to_string()))
            .collect();
        self.register(file_name, head, body);
    }

    /// Define a concept whose body is a single call to another concept.
    pub fn define_nested_concept(&mut self, file_name: &str, head: &str, inner: &str) {
        self.register(file_name, head, vec![TemplateStep::Concept(inner.to_string())]);
    }

    pub fn spec(&mut self, file_name: &str) -> SpecId {
        let heading = self.heading(file_name);
        self.suite.add_spec(file_name, heading)
    }

    pub fn scenario(&mut self, spec: SpecId, heading: &str) -> ScenarioId {
        let heading = self.heading(heading);
        self.suite.add_scenario(spec, heading)
    }

    pub fn context_step(&mut self, spec: SpecId, value: &str, args: &[&str]) -> StepId {
        let id = self.literal(value, args);
        self.suite.push_context_step(spec, id);
        id
    }

    pub fn context_concept(&mut self, spec: SpecId, head: &str) -> StepId {
        let id = self.instantiate(head);
        self.suite.push_context_step(spec, id);
        id
    }

    pub fn tear_down(&mut self, spec: SpecId) {
        let line_no = self.line();
        self.suite.push_spec_item(
            spec,
            Item::TearDown(TearDown {
                text: "___".to_string(),
                line_no,
            }),
        );
    }

    pub fn scenario_step(&mut self, scenario: ScenarioId, value: &str, args: &[&str]) -> StepId {
        let id = self.literal(value, args);
        self.suite.push_scenario_step(scenario, id);
        id
    }

    pub fn scenario_concept(&mut self, scenario: ScenarioId, head: &str) -> StepId {
        let id = self.instantiate(head);
        self.suite.push_scenario_step(scenario, id);
        id
    }

    pub fn finish(self) -> (Suite, ConceptDictionary) {
        (self.suite, self.concepts)
    }

    pub fn parsed(self) -> ParsedSuite {
        let (suite, concepts) = self.finish();
        ParsedSuite {
            suite,
            concepts,
            parse: ParseResult::default(),
        }
    }
}

/// Answer a [`ScriptedRunner`] gives for one step text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedResponse {
    Valid,
    /// Invalid with the given runner error type.
    Invalid(&'static str),
    Timeout,
    ConnectionClosed,
    WrongMessageType,
}

/// Runner fake answering from a table; unknown steps are valid.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, ScriptedResponse>,
    requests: Vec<(String, usize)>,
    kills: usize,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, step_text: &str, response: ScriptedResponse) -> Self {
        self.responses.insert(step_text.to_string(), response);
        self
    }

    /// Step texts and parameter counts received, in order.
    pub fn requests(&self) -> Vec<(String, usize)> {
        self.requests.clone()
    }

    pub fn kill_count(&self) -> usize {
        self.kills
    }
}

impl RunnerClient for ScriptedRunner {
    fn request(&mut self, message: Message, timeout: Duration) -> Result<Message, TransportError> {
        let request = message
            .step_validate_request
            .ok_or_else(|| {
                TransportError::Malformed("expected a step validate request".to_string())
            })?;
        let response = self
            .responses
            .get(&request.step_text)
            .copied()
            .unwrap_or(ScriptedResponse::Valid);
        self.requests
            .push((request.step_text, request.number_of_parameters));

        match response {
            ScriptedResponse::Valid => Ok(validate_response(true, None)),
            ScriptedResponse::Invalid(error_type) => Ok(validate_response(false, Some(error_type))),
            ScriptedResponse::Timeout => Err(TransportError::Timeout(timeout)),
            ScriptedResponse::ConnectionClosed => Err(TransportError::ConnectionClosed),
            ScriptedResponse::WrongMessageType => Ok(Message::kill_process_request()),
        }
    }

    fn kill(&mut self) -> Result<()> {
        self.kills += 1;
        Ok(())
    }
}

fn validate_response(is_valid: bool, error_type: Option<&str>) -> Message {
    Message::step_validate_response(StepValidateResponse {
        is_valid,
        error_type: error_type.map(str::to_string),
        error_message: String::new(),
    })
}

/// Temporary project directory with a config file and a suite document.
pub struct TestProject {
    dir: tempfile::TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp project")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, cfg: &StepcheckConfig) -> Result<()> {
        write_config(&self.root().join(CONFIG_FILE_NAME), cfg)
    }

    /// Write the suite document to the default `.stepcheck/suite.json`.
    pub fn write_suite_json(&self, contents: &str) -> Result<()> {
        let path = self.root().join(StepcheckConfig::default().suite_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }
}
