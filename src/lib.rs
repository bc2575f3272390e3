// src/lib.rs
//! Classification core for citizen civic-issue reports.
//!
//! A report description goes through the local keyword classifier and the external
//! analysis adapter; the combiner merges both into an immutable [`Analysis`]. Adapter
//! failures never reach the caller: the result degrades to the local heuristic.

pub mod analysis;
pub mod bootstrap;
pub mod classify;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod report;
pub mod taxonomy;

// ---- Re-exports for stable public API ----
pub use crate::analysis::{Analysis, Category, UrgencyLevel};
pub use crate::bootstrap::AnalysisRuntime;
pub use crate::classify::{ClassificationPipeline, ReportContext};
pub use crate::error::{AdapterFailure, ClassifyError, IntakeError};
pub use crate::logging::init_tracing;
pub use crate::metrics::Metrics;
pub use crate::report::{MemoryReportStore, Report, ReportDraft, ReportIntake, ReportStore};
