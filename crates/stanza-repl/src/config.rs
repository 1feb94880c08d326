//! `config.toml` for the `stanza` binary.
//!
//! ```toml
//! registry = "~/.config/stanza/commands.json"
//! timeout_secs = 30
//! abort_on_failure = false
//! unlocked = ["ops.deploy"]
//! audit_log = "/var/log/stanza/audit.ndjson"
//! ```
//!
//! Every field is optional. Command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stanza_kernel::{InterpreterConfig, KernelConfig};

use crate::paths;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Registry JSON file. Defaults to `commands.json` next to this file,
    /// when it exists.
    pub registry: Option<PathBuf>,
    /// Per-command time limit. `0` disables the limit.
    pub timeout_secs: Option<u64>,
    /// Stop `→`/`>` chains at the first failure.
    pub abort_on_failure: bool,
    /// Command keys allowed under `🔒`.
    pub unlocked: Vec<String>,
    /// NDJSON file for `⚠️` audit entries.
    pub audit_log: Option<PathBuf>,
}

impl Config {
    /// Load `path`, or the default config file when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let path = paths::config_file();
                if path.exists() {
                    Self::read(&path)
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Registry path to load: the configured one, else the default file if
    /// present.
    pub fn registry_path(&self) -> Option<PathBuf> {
        self.registry.clone().or_else(|| {
            let default = paths::registry_file();
            default.exists().then_some(default)
        })
    }

    pub fn kernel_config(&self) -> KernelConfig {
        let timeout = match self.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => InterpreterConfig::default().command_timeout,
        };
        KernelConfig {
            registry_path: self.registry_path(),
            interpreter: InterpreterConfig::default()
                .with_timeout(timeout)
                .with_abort_on_failure(self.abort_on_failure),
            unlocked: self.unlocked.clone(),
            unlock_all: false,
            audit_log: self.audit_log.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::from_toml("").expect("parses"), Config::default());
    }

    #[test]
    fn full_file() {
        let config = Config::from_toml(
            r#"
            registry = "/etc/stanza/commands.json"
            timeout_secs = 5
            abort_on_failure = true
            unlocked = ["ops.deploy"]
            audit_log = "/tmp/audit.ndjson"
            "#,
        )
        .expect("parses");
        assert_eq!(config.timeout_secs, Some(5));
        assert!(config.abort_on_failure);

        let kernel = config.kernel_config();
        assert_eq!(kernel.registry_path, Some(PathBuf::from("/etc/stanza/commands.json")));
        assert_eq!(kernel.interpreter.command_timeout, Some(Duration::from_secs(5)));
        assert!(kernel.interpreter.abort_on_failure);
        assert_eq!(kernel.unlocked, vec!["ops.deploy"]);
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let config = Config {
            timeout_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(config.kernel_config().interpreter.command_timeout, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("bogus = 1").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }
}
