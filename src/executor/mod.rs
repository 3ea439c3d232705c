//! Test execution
//!
//! Module loading, the engine interface with its shell command
//! implementation, and run coordination.

mod command;
mod coordinator;
mod engine;
mod loader;
#[cfg(test)]
pub(crate) mod testing;

pub use command::CommandEngine;
pub use coordinator::RunCoordinator;
pub use engine::{EngineEvent, ExecutionEngine};
pub use loader::ModuleLoader;
