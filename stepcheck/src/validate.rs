//! `stepcheck validate`: select specs, validate them against a runner, aggregate.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{error, info, instrument, warn};

use crate::core::aggregate::{ValidationErrMaps, build_err_maps};
use crate::core::model::{SpecId, Suite};
use crate::io::config::{CONFIG_FILE_NAME, load_config};
use crate::io::report::{build_report, write_report};
use crate::io::runner::{ProcessRunner, RunnerClient, RunnerGuard};
use crate::io::suite_store::{ParsedSuite, load_suite};
use crate::step_validator::Validator;

/// Overall result of a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    /// The parser reported errors. Critical ones stop validation before the
    /// runner starts; `errors` holds whichever list caused the failure.
    ParseFailed { errors: Vec<String> },
    /// Nothing matched the selection; the runner was never started.
    NoSpecs,
    Passed,
    Failed,
}

impl ValidationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ParseFailed { .. } => "parse_failed",
            Self::NoSpecs => "no_specs",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ParseFailed { .. } => crate::exit_codes::INVALID,
            Self::NoSpecs | Self::Passed => crate::exit_codes::OK,
            Self::Failed => crate::exit_codes::VALIDATION_FAILED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    /// Specs that were validated, in suite order.
    pub specs: Vec<SpecId>,
    pub err_map: ValidationErrMaps,
}

impl ValidationResult {
    fn without_specs(status: ValidationStatus) -> Self {
        Self {
            status,
            specs: Vec::new(),
            err_map: ValidationErrMaps::new(),
        }
    }
}

/// Specs whose file lies under one of `selection` (component-wise).
///
/// An empty selection picks every spec.
pub fn select_specs(suite: &Suite, selection: &[PathBuf]) -> Vec<SpecId> {
    let selection: Vec<PathBuf> = selection.iter().map(|p| normalize(p)).collect();
    suite
        .specs()
        .iter()
        .filter(|spec| {
            let file = normalize(Path::new(&spec.file_name));
            selection.is_empty() || selection.iter().any(|sel| file.starts_with(sel))
        })
        .map(|spec| spec.id)
        .collect()
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Validate the selected specs of `parsed`.
///
/// `start_runner` is only called when there is something to validate. The
/// runner is killed before returning on every path after it started.
#[instrument(skip_all, fields(selection = ?selection))]
pub fn validate_specs<R, F>(
    parsed: &ParsedSuite,
    selection: &[PathBuf],
    timeout: Duration,
    start_runner: F,
) -> Result<ValidationResult>
where
    R: RunnerClient,
    F: FnOnce() -> Result<R>,
{
    if !parsed.parse.critical_errors.is_empty() {
        for err in &parsed.parse.critical_errors {
            error!("[ParseError] {err}");
        }
        return Ok(ValidationResult::without_specs(ValidationStatus::ParseFailed {
            errors: parsed.parse.critical_errors.clone(),
        }));
    }

    let specs = select_specs(&parsed.suite, selection);
    if specs.is_empty() {
        let names: Vec<String> = selection.iter().map(|p| p.display().to_string()).collect();
        info!("No specifications found in {}.", names.join(", "));
        return Ok(ValidationResult::without_specs(ValidationStatus::NoSpecs));
    }

    let runner = start_runner().context("start runner")?;
    let mut guard = RunnerGuard::new(runner);
    let spec_errors = Validator::new(&parsed.suite, &parsed.concepts, guard.runner_mut(), timeout)
        .validate(&specs);
    for err in spec_errors.values().flatten() {
        error!("[ValidationError] {err}");
    }
    let err_map = build_err_maps(&parsed.suite, &spec_errors);
    if let Err(err) = guard.release() {
        warn!(err = %format!("{err:#}"), "failed to stop runner");
    }

    let status = if !parsed.parse.ok {
        for err in &parsed.parse.errors {
            error!("[ParseError] {err}");
        }
        ValidationStatus::ParseFailed {
            errors: parsed.parse.errors.clone(),
        }
    } else if err_map.step_errs.is_empty() {
        info!("No error found.");
        ValidationStatus::Passed
    } else {
        ValidationStatus::Failed
    };

    Ok(ValidationResult {
        status,
        specs,
        err_map,
    })
}

/// Inputs of `stepcheck validate`, paths relative to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Spec files or directories; empty means the configured specs dir.
    pub specs: Vec<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub suite_path: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub report_path: Option<PathBuf>,
}

/// Load config and suite from `root`, validate against the configured runner
/// process and write the optional report.
pub fn run_validation(root: &Path, options: &ValidateOptions) -> Result<ValidationResult> {
    let config_path = resolve(root, options.config_path.as_deref(), Path::new(CONFIG_FILE_NAME));
    let cfg = load_config(&config_path).with_context(|| "load config")?;
    let timeout = match options.timeout_ms {
        Some(0) => return Err(anyhow!("--timeout-ms must be > 0")),
        Some(ms) => Duration::from_millis(ms),
        None => cfg.request_timeout(),
    };

    let suite_path = resolve(root, options.suite_path.as_deref(), &cfg.suite_path);
    let parsed = load_suite(&suite_path).with_context(|| "load suite document")?;

    let selection: Vec<PathBuf> = if options.specs.is_empty() {
        vec![PathBuf::from(&cfg.specs_dir)]
    } else {
        options
            .specs
            .iter()
            .map(|p| p.strip_prefix(root).unwrap_or(p).to_path_buf())
            .collect()
    };

    let result = validate_specs(&parsed, &selection, timeout, || {
        ProcessRunner::spawn(&cfg.runner.command, root, cfg.kill_timeout())
    })?;

    if let Some(report_path) = &options.report_path {
        let report = build_report(
            &parsed.suite,
            result.status.label(),
            &result.specs,
            &result.err_map,
        );
        let path = resolve(root, None, report_path);
        write_report(&path, &report)?;
        info!(path = %path.display(), "report written");
    }

    Ok(result)
}

fn resolve(root: &Path, explicit: Option<&Path>, default: &Path) -> PathBuf {
    let path = explicit.unwrap_or(default);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
