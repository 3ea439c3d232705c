//! Test module references

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::path::display_name;

/// Opaque name of a unit of test code, as declared in the module list.
///
/// The position of a reference in the list is its registration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestModuleRef(String);

impl TestModuleRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Basename used when the module is shown to a subscriber
    pub fn display_name(&self) -> &str {
        display_name(&self.0)
    }

    /// Resolve against a module root. Absolute references are kept as is.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.0);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

impl From<&str> for TestModuleRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TestModuleRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for TestModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
