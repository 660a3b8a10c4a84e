//! # sitefab_core
//!
//! Generation pipeline and self-healing recovery for siteFab.
//!
//! # Architecture
//!
//! - **Pipeline**: planning, component generation, page assembly and final
//!   validation over an immutable [`PipelineState`]
//! - **Recovery loop**: analyse, consult the knowledge base, fix and
//!   re-verify within a trial budget
//! - **Workspace**: the `site-<timestamp>` output directory
//! - **Config**: `sitefab.toml` plus environment overlay
//!
//! # Example
//!
//! ```rust,ignore
//! use sitefab_core::{FactoryConfig, PipelineController};
//! use sitefab_spec::ChecklistReader;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = FactoryConfig::load(None)?;
//! let controller = PipelineController::from_config(config)?;
//! let checklist = ChecklistReader::read("site.json")?;
//!
//! let report = controller.run(&checklist, CancellationToken::new()).await;
//! println!("{}", report.message);
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod recovery;
pub mod report;
pub mod state;
pub mod workspace;

pub use config::{FactoryConfig, LlmSettings, DEFAULT_CONFIG_FILE};
pub use error::{CoreError, CoreResult};
pub use pipeline::{PipelineController, CANCELLED_REASON};
pub use recovery::{
    AttemptOutcome, AttemptRecord, ErrorRecord, FailureReport, RecoveryLoop, RecoveryOutcome,
    RecoveryRequest, RecoveryState, RecoveryStatus, Scope,
};
pub use report::{FailedUnit, GenerationReport, ReportStatus};
pub use state::{Phase, PipelineState, SessionRecord, Unit, UnitStatus, UnitUpdate};
pub use workspace::{resolve_path, Workspace};
