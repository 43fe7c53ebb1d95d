use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use crate::completion::{FileSidecarReader, RetryPolicy};
use crate::normalize::NameTables;
use crate::registry::{Decoder, Registry, RegistryError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub names: NamesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl CompletionConfig {
    /// Retry policy for sidecar polling.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.timeout_ms, self.poll_interval_ms)
    }

    /// File reader over `dir` with the configured lock timeout.
    #[must_use]
    pub fn sidecar_reader(&self, dir: &Path) -> FileSidecarReader {
        FileSidecarReader::new(dir).with_lock_timeout(Duration::from_millis(self.lock_timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Extra tags to keep verbatim as withdrawn.
    #[serde(default)]
    pub withdrawn: Vec<String>,
    #[serde(default = "default_true")]
    pub retain_source: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            withdrawn: Vec::new(),
            retain_source: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamesConfig {
    /// Identifier → friendly name, layered over the built-in table.
    #[serde(default)]
    pub friendly: BTreeMap<String, String>,
    /// Legacy identifier → current identifier.
    #[serde(default)]
    pub remap: BTreeMap<String, String>,
}

impl ProjectConfig {
    /// Registry with the built-in catalog plus the configured withdrawn tags.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateTagRegistration`] when a configured
    /// withdrawn tag already has a decoder.
    pub fn registry(&self) -> Result<Registry, RegistryError> {
        let mut registry = Registry::with_builtin();
        for tag in &self.decode.withdrawn {
            registry.withdraw(tag)?;
        }
        Ok(registry)
    }

    /// Name tables with the configured overrides applied.
    #[must_use]
    pub fn name_tables(&self) -> NameTables {
        if self.names.friendly.is_empty() && self.names.remap.is_empty() {
            NameTables::builtin()
        } else {
            NameTables::with_overrides(&self.names.friendly, &self.names.remap)
        }
    }

    /// A decoder configured from this file.
    ///
    /// # Errors
    ///
    /// See [`ProjectConfig::registry`].
    pub fn decoder(&self) -> Result<Decoder, RegistryError> {
        Ok(Decoder::new(self.registry()?, self.name_tables())
            .with_retain_source(self.decode.retain_source))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".logbook/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("logbook/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format)?;

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> Result<String> {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return Ok("json".to_string());
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if std::io::stdout().is_terminal() {
        Ok("pretty".to_string())
    } else {
        Ok("text".to_string())
    }
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_ms() -> u64 {
    2000
}

const fn default_poll_interval_ms() -> u64 {
    100
}

const fn default_lock_timeout_ms() -> u64 {
    250
}
