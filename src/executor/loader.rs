//! Test module loading

use tracing::{debug, info};

use super::ExecutionEngine;
use crate::error::LoadError;
use crate::models::TestModuleRef;

/// Registers a fixed, ordered module list with an engine
#[derive(Clone, Debug)]
pub struct ModuleLoader {
    modules: Vec<TestModuleRef>,
}

impl ModuleLoader {
    pub fn new<I, M>(modules: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<TestModuleRef>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }

    /// Register every module in list order and return the engine's total.
    ///
    /// Stops at the first module that cannot be resolved; the engine must
    /// not be run after an error.
    pub fn load(&self, engine: &mut dyn ExecutionEngine) -> Result<usize, LoadError> {
        for module in &self.modules {
            let count = engine.register(module)?;
            debug!("Registered {} ({} tests)", module, count);
        }

        let total = engine.total_tests();
        info!("Loaded {} test modules, {} tests", self.modules.len(), total);
        Ok(total)
    }
}
