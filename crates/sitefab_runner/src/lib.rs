//! # sitefab_runner
//!
//! Validation tooling for generated sites.
//!
//! The pipeline only needs pass/fail plus a log from each tool. This crate
//! provides that boundary:
//!
//! - **Validator trait**: one `validate` call per [`ValidatorKind`]
//! - **Command validator**: runs the project's npm / Playwright commands with
//!   per-kind timeouts
//! - **Mock validator**: scripted verdicts for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use sitefab_runner::{CommandValidator, ValidationTarget, Validator, ValidatorConfig, ValidatorKind};
//!
//! #[tokio::main]
//! async fn main() {
//!     let validator = CommandValidator::new(ValidatorConfig::default());
//!     let target = ValidationTarget::project("./output/site-20240101-120000");
//!
//!     let verdict = validator.validate(&target, ValidatorKind::Build).await;
//!     println!("Build passed: {}", verdict.passed);
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod mock;
pub mod validator;

pub use command::CommandValidator;
pub use config::{ValidatorConfig, ValidatorTimeouts, TEST_FILE_PLACEHOLDER};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockValidator};
pub use validator::{ExecutionResult, ValidationTarget, Validator, ValidatorKind, Verdict};
