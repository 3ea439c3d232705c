//! Shared utilities

pub mod logger;
pub mod path;
pub mod timer;
