//! Analyzer configuration
//!
//! ```toml
//! owner_id = "E1"
//! key_env = "WORKTRACE_KEY"   # or: key = "<base64 key>"
//! afk_policy = "lenient"      # or "strict"
//! parallel = false
//! data_file = "activity.json"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::ComputeError;
use crate::key::Key;
use crate::rollup::RollupOptions;
use crate::types::AfkPolicy;

/// Environment variable consulted for the key when none is configured
pub const DEFAULT_KEY_ENV: &str = "WORKTRACE_KEY";

/// Worktrace configuration
#[derive(Clone, Deserialize)]
pub struct WorktraceConfig {
    /// Owner whose records are analyzed
    #[serde(default)]
    pub owner_id: Option<String>,

    /// Key text (base64); takes precedence over `key_env`. Wiped on drop.
    #[serde(default)]
    pub key: Option<Zeroizing<String>>,

    /// Environment variable holding the key text
    #[serde(default = "default_key_env")]
    pub key_env: String,

    /// AFK flag interpretation
    #[serde(default)]
    pub afk_policy: AfkPolicy,

    /// Aggregate rollup dates on worker threads
    #[serde(default)]
    pub parallel: bool,

    /// Activity export to read
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

fn default_key_env() -> String {
    DEFAULT_KEY_ENV.to_string()
}

impl fmt::Debug for WorktraceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorktraceConfig")
            .field("owner_id", &self.owner_id)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("key_env", &self.key_env)
            .field("afk_policy", &self.afk_policy)
            .field("parallel", &self.parallel)
            .field("data_file", &self.data_file)
            .finish()
    }
}

impl Default for WorktraceConfig {
    fn default() -> Self {
        Self {
            owner_id: None,
            key: None,
            key_env: default_key_env(),
            afk_policy: AfkPolicy::default(),
            parallel: false,
            data_file: None,
        }
    }
}

impl WorktraceConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map(Zeroizing::new)
            .map_err(|e| {
                ComputeError::ConfigError(format!("cannot read {}: {}", path.display(), e))
            })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ComputeError> {
        toml::from_str(content).map_err(|e| ComputeError::ConfigError(e.to_string()))
    }

    /// Resolve the key from `key`, falling back to the `key_env` variable.
    ///
    /// `Ok(None)` means no key is configured and field text is read verbatim.
    pub fn resolve_key(&self) -> Result<Option<Key>, ComputeError> {
        if let Some(text) = &self.key {
            return Key::from_optional_encoded(Some(text.as_str()));
        }
        let from_env = std::env::var(&self.key_env).ok().map(Zeroizing::new);
        Key::from_optional_encoded(from_env.as_ref().map(|text| text.as_str()))
    }

    pub fn rollup_options(&self) -> RollupOptions {
        RollupOptions {
            parallel: self.parallel,
        }
    }
}
