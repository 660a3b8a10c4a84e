//! # sitefab_spec
//!
//! Input and planning models for the siteFab generation pipeline.
//!
//! This crate describes *what* is being built:
//!
//! - **Checklist**: the structured website description handed to the factory
//!   (branding colours, pages, ordered sections per page)
//! - **Project Plan**: the ordered list of components and pages produced by the
//!   planner agent from a checklist
//! - **Validation**: human-readable validation with actionable error messages
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitefab_spec::{ChecklistReader, ChecklistValidator};
//!
//! let checklist = ChecklistReader::read("./site.json").unwrap();
//! let result = ChecklistValidator::validate(&checklist);
//! if !result.valid {
//!     for error in &result.errors {
//!         eprintln!("Error: {}", error);
//!     }
//! }
//! ```

pub mod checklist;
pub mod error;
pub mod plan;
pub mod reader;
pub mod validator;

pub use checklist::{Branding, Checklist, PageSpec, SectionSpec};
pub use error::{SpecError, SpecResult};
pub use plan::{PlanTask, ProjectPlan, TaskKind};
pub use reader::ChecklistReader;
pub use validator::{ChecklistValidator, ValidationResult};
