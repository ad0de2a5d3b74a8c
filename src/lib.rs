//! cogbias - scoring engine for cognitive-bias tasks and mood questionnaires
//!
//! cogbias turns an experiment platform export into participant-level indices
//! through a deterministic pipeline: trial parsing → alignment → inclusion and
//! classification → index reduction → quality annotation → aggregation.
//!
//! ## Tasks
//!
//! - **AST**: reverse-scored outcome ratings and a free-text coding template
//! - **PST**: accuracy-gated reaction-time bias index
//! - **SST**: sentence-interpretation negativity score
//! - **WSAP**: endorsement and forced-choice variants, with a DDM trial export
//! - **Questionnaires**: QIDS and GAD totals, MASQ subscales

pub mod aggregate;
pub mod aligner;
pub mod classify;
pub mod config;
pub mod error;
pub mod indices;
pub mod parser;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod schema;
pub mod summary;
pub mod tasks;
pub mod types;

pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use pipeline::{analyze_table, build_report, AnalysisProcessor, ColumnCheck};
pub use report::{ReportManifest, ReportWriter, Sheet, TaskReport};
pub use schema::{ParticipantRow, ParticipantTable, TableSchema};
pub use tasks::{analyzer_for, Task, TaskAnalyzer};
pub use types::{DataQuality, ParticipantResult};

/// cogbias version recorded in every report manifest
pub const COGBIAS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report manifests
pub const PRODUCER_NAME: &str = "cogbias";
