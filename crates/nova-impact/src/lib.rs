//! Incremental cross-file impact analysis.
//!
//! After a structural edit to a class, field or method, the engine finds the elements in other
//! files that no longer resolve or type-check and reports them as [`Problem`]s against the
//! declaration that broke them. The work is bounded: when a change could affect more files than
//! [`ImpactConfig::max_files_to_search_usages_in`], the declaration's problems are retracted and
//! it is marked [`DeclState::Unknown`] instead of being partially reported.
//!
//! Leaf first:
//! - [`snapshot`]: structural fingerprints and their classification.
//! - [`detector`]: baselines per declaration.
//! - [`scope`] and [`scanner`]: which files a change can reach.
//! - [`verifier`]: which elements of those files are actually broken.
//! - [`problem`]: the problem store.
//! - [`engine`]: the coordinator tying edits, editors and passes together.

pub mod decl;
pub mod detector;
pub mod engine;
mod error;
pub mod index;
pub mod model;
pub mod problem;
pub mod project;
pub mod scanner;
pub mod scope;
pub mod snapshot;
pub mod verifier;

pub use decl::DeclId;
pub use engine::{DeclState, HighlightRequest, HighlightResult, ImpactEngine};
pub use error::{EngineError, EngineResult};
pub use nova_config::ImpactConfig;
pub use problem::{Problem, ProblemKind};
pub use project::ElementId;
pub use scanner::ScanOutcome;
pub use scope::ScanScope;
pub use snapshot::{ChangeKind, Snapshot};
