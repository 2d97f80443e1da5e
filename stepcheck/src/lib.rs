//! Static step validation for specification suites.
//!
//! A specification suite (specs, scenarios, shared context and teardown steps,
//! reusable concepts) is checked against a language runner before anything is
//! executed: every distinct step is sent to the runner once, and the failures
//! are rolled up per step, scenario and specification.
//!
//! - **[`core`]**: Pure logic over the suite arena (traversal, concept
//!   expansion, caching, aggregation). No I/O.
//! - **[`io`]**: Suite documents, configuration, the runner process and
//!   reports.
//!
//! [`step_validator`] and [`validate`] wire the two together for
//! `stepcheck validate`.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod step_validator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
