//! Data models for test runs and reports
//!
//! This module contains all data structures shared between the run and
//! merge phases.

mod module;
mod report;
mod suite;

pub use module::TestModuleRef;
pub use report::{
    MergedReport, ReportArtifact, ReportMeta, ReportStats, SuiteRecord, TestRecord, TestState,
};
pub use suite::{SuiteDescriptor, TestOutcome};
