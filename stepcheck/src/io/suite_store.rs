//! Load the parser's suite document with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::concept::{Concept, ConceptDictionary};
use crate::core::invariants::validate_invariants;
use crate::core::model::{
    Comment, Heading, Item, ScenarioId, SpecId, StepId, Suite, Table, Tags, TearDown,
};

pub const SUITE_SCHEMA: &str = include_str!("../../schemas/suite/v1.schema.json");

/// What the parser reported about the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseResult {
    pub ok: bool,
    /// Errors that leave no usable tree; validation must not start.
    pub critical_errors: Vec<String>,
    pub errors: Vec<String>,
}

impl Default for ParseResult {
    fn default() -> Self {
        Self {
            ok: true,
            critical_errors: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Parser output ready for validation.
#[derive(Debug, Clone, Default)]
pub struct ParsedSuite {
    pub suite: Suite,
    pub concepts: ConceptDictionary,
    pub parse: ParseResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteDoc {
    #[serde(default)]
    pub parse: ParseResult,
    #[serde(default)]
    pub concepts: Vec<ConceptDoc>,
    #[serde(default)]
    pub specs: Vec<SpecDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptDoc {
    pub file: String,
    pub step: StepDoc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecDoc {
    pub file: String,
    pub heading: HeadingDoc,
    #[serde(default)]
    pub items: Vec<ItemDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingDoc {
    pub text: String,
    pub line_no: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDoc {
    Comment {
        text: String,
        line_no: usize,
    },
    Tags {
        values: Vec<String>,
        line_no: usize,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        line_no: usize,
    },
    Step(StepDoc),
    TearDown {
        text: String,
        line_no: usize,
    },
    Scenario {
        heading: HeadingDoc,
        #[serde(default)]
        items: Vec<ItemDoc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDoc {
    pub value: String,
    pub line_text: String,
    pub line_no: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_concept: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concept_steps: Vec<StepDoc>,
}

/// Load and validate a suite document from disk.
pub fn load_suite(path: &Path) -> Result<ParsedSuite> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read suite {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse suite {}", path.display()))?;
    validate_schema(&value)?;
    let doc: SuiteDoc = serde_json::from_value(value)
        .with_context(|| format!("deserialize suite {}", path.display()))?;
    build_suite(&doc)
}

/// Build the arena and concept dictionary from a document.
pub fn build_suite(doc: &SuiteDoc) -> Result<ParsedSuite> {
    let mut suite = Suite::new();
    let mut concepts = ConceptDictionary::new();

    for concept in &doc.concepts {
        let head = add_step(&mut suite, &concept.step)?;
        let previous = concepts.add(
            concept.step.value.clone(),
            Concept {
                step: head,
                file_name: concept.file.clone(),
            },
        );
        if let Some(previous) = previous {
            bail!(
                "duplicate concept '{}' in {} and {}",
                concept.step.value,
                previous.file_name,
                concept.file
            );
        }
    }

    for spec_doc in &doc.specs {
        let spec = suite.add_spec(spec_doc.file.clone(), heading(&spec_doc.heading));
        for item in &spec_doc.items {
            add_spec_item(&mut suite, spec, item)
                .with_context(|| format!("load spec {}", spec_doc.file))?;
        }
    }

    let errors = validate_invariants(&suite, &concepts);
    if !errors.is_empty() {
        return Err(anyhow!("suite invariants failed: {}", errors.join("; ")));
    }

    debug!(
        specs = suite.specs().len(),
        steps = suite.steps().len(),
        concepts = concepts.len(),
        "suite loaded"
    );
    Ok(ParsedSuite {
        suite,
        concepts,
        parse: doc.parse.clone(),
    })
}

fn add_spec_item(suite: &mut Suite, spec: SpecId, item: &ItemDoc) -> Result<()> {
    match item {
        ItemDoc::Step(step) => {
            let id = add_step(suite, step)?;
            suite.push_context_step(spec, id);
        }
        ItemDoc::Scenario { heading: h, items } => {
            let scenario = suite.add_scenario(spec, heading(h));
            for item in items {
                add_scenario_item(suite, scenario, item)?;
            }
        }
        other => suite.push_spec_item(spec, plain_item(other)?),
    }
    Ok(())
}

fn add_scenario_item(suite: &mut Suite, scenario: ScenarioId, item: &ItemDoc) -> Result<()> {
    match item {
        ItemDoc::Step(step) => {
            let id = add_step(suite, step)?;
            suite.push_scenario_step(scenario, id);
        }
        ItemDoc::Scenario { heading, .. } => {
            bail!("scenario '{}' nested inside a scenario", heading.text)
        }
        ItemDoc::TearDown { line_no, .. } => {
            bail!("teardown marker at line {line_no} inside a scenario")
        }
        other => suite.push_scenario_item(scenario, plain_item(other)?),
    }
    Ok(())
}

fn plain_item(item: &ItemDoc) -> Result<Item> {
    Ok(match item {
        ItemDoc::Comment { text, line_no } => Item::Comment(Comment {
            text: text.clone(),
            line_no: *line_no,
        }),
        ItemDoc::Tags { values, line_no } => Item::Tags(Tags {
            values: values.clone(),
            line_no: *line_no,
        }),
        ItemDoc::Table {
            headers,
            rows,
            line_no,
        } => Item::Table(Table {
            headers: headers.clone(),
            rows: rows.clone(),
            line_no: *line_no,
        }),
        ItemDoc::TearDown { text, line_no } => Item::TearDown(TearDown {
            text: text.clone(),
            line_no: *line_no,
        }),
        ItemDoc::Step(_) | ItemDoc::Scenario { .. } => bail!("expected a non-step item"),
    })
}

fn add_step(suite: &mut Suite, doc: &StepDoc) -> Result<StepId> {
    if !doc.is_concept {
        if !doc.concept_steps.is_empty() {
            bail!(
                "step '{}' at line {} has concept steps but is not a concept",
                doc.value,
                doc.line_no
            );
        }
        return Ok(suite.new_step(
            doc.value.clone(),
            doc.line_text.clone(),
            doc.line_no,
            doc.args.clone(),
        ));
    }
    let body = doc
        .concept_steps
        .iter()
        .map(|child| add_step(suite, child))
        .collect::<Result<Vec<_>>>()?;
    Ok(suite.new_concept_step(
        doc.value.clone(),
        doc.line_text.clone(),
        doc.line_no,
        doc.args.clone(),
        body,
    ))
}

fn heading(doc: &HeadingDoc) -> Heading {
    Heading {
        text: doc.text.clone(),
        line_no: doc.line_no,
    }
}

fn validate_schema(suite: &Value) -> Result<()> {
    let schema_value: Value = serde_json::from_str(SUITE_SCHEMA).context("parse suite schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(suite) {
        let messages = compiled
            .iter_errors(suite)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "suite schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
