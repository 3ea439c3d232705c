//! Report artifacts
//!
//! Building per-run artifacts from engine events, persisting them, merging
//! them into one aggregate and rendering the aggregate.

mod builder;
mod merge;
mod report;
mod storage;
#[cfg(test)]
pub(crate) mod testing;

pub use builder::ReportBuilder;
pub use merge::{merge, ReportMerger};
pub use report::{format_summary, merged_title, HtmlRenderer, RenderOptions, ReportRenderer};
pub use storage::ReportStore;
