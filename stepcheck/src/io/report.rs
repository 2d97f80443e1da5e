//! JSON report of a validation run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::aggregate::ValidationErrMaps;
use crate::core::model::{SpecId, Suite};
use crate::core::outcome::StepValidationError;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub status: String,
    pub specs_validated: usize,
    pub spec_errors: Vec<SpecReport>,
    pub scenario_errors: Vec<ScenarioReport>,
    pub step_errors: Vec<StepValidationError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecReport {
    pub file: String,
    pub heading: String,
    pub errors: Vec<StepValidationError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub file: String,
    pub heading: String,
    pub line_no: usize,
    pub errors: Vec<StepValidationError>,
}

/// Render the error maps with file names and headings instead of arena ids.
pub fn build_report(
    suite: &Suite,
    status: &str,
    specs: &[SpecId],
    maps: &ValidationErrMaps,
) -> ValidationReport {
    let spec_errors = maps
        .spec_errs
        .iter()
        .map(|(id, errors)| {
            let spec = suite.spec(*id);
            SpecReport {
                file: spec.file_name.clone(),
                heading: spec.heading.text.clone(),
                errors: errors.clone(),
            }
        })
        .collect();
    let scenario_errors = maps
        .scenario_errs
        .iter()
        .map(|(id, errors)| {
            let scenario = suite.scenario(*id);
            ScenarioReport {
                file: suite.spec(scenario.spec).file_name.clone(),
                heading: scenario.heading.text.clone(),
                line_no: scenario.heading.line_no,
                errors: errors.clone(),
            }
        })
        .collect();

    ValidationReport {
        status: status.to_string(),
        specs_validated: specs.len(),
        spec_errors,
        scenario_errors,
        step_errors: maps.step_errs.values().cloned().collect(),
    }
}

/// Serialize `report` to pretty-printed JSON with trailing newline.
pub fn write_report(path: &Path, report: &ValidationReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir {}", parent.display()))?;
    }
    let mut payload = serde_json::to_string_pretty(report).context("serialize report")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write report {}", path.display()))
}
