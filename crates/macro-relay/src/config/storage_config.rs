use crate::config::default_macros_dir;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where macros are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the macro files.
    #[serde(default = "default_macros_dir")]
    pub macros_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            macros_dir: default_macros_dir(),
        }
    }
}
