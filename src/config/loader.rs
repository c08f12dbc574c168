//! Configuration and workflow loading

use super::provider::default_timeout;
use super::{ProviderConfig, Workflow};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level orquestra configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrquestraConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Provider settings, keyed by provider name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

/// Global default settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Default request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Run the tasks of a batch concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Max concurrent tasks within a batch
    pub max_concurrent: Option<usize>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            parallel: false,
            max_concurrent: None,
        }
    }
}

impl OrquestraConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/orquestra/config.toml
    /// 3. .orquestra/config.toml (project)
    ///
    /// Layers merge key by key, so any key a later file sets wins, even
    /// when it restates a built-in default.
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let project_config_path = project_dir
            .map(|p| p.join(".orquestra/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".orquestra/config.toml"));

        let mut layers = Vec::new();
        for path in Self::user_config_path()
            .into_iter()
            .chain(Some(project_config_path))
        {
            if path.exists() {
                layers.push(read_table(&path)?);
            }
        }

        Self::from_layers(layers)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        Self::from_layers([read_table(path)?])
            .with_context(|| format!("parsing {}", path.display()))
    }

    /// Build a config from TOML layers, later layers taking precedence
    pub fn from_layers<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = toml::Table>,
    {
        let mut merged = toml::Table::new();
        for layer in layers {
            merge_tables(&mut merged, layer);
        }
        let config = toml::Value::Table(merged).try_into()?;
        Ok(config)
    }

    /// Get the user config path (~/.config/orquestra/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("orquestra/config.toml"))
    }

    /// Settings for a provider, or defaults carrying the global timeout
    pub fn provider(&self, name: &str) -> ProviderConfig {
        self.providers.get(name).cloned().unwrap_or_else(|| ProviderConfig {
            timeout: self.defaults.timeout,
            ..Default::default()
        })
    }

    /// Whether a provider is enabled (unconfigured providers are)
    pub fn provider_enabled(&self, name: &str) -> bool {
        self.providers.get(name).is_none_or(|p| p.enabled)
    }
}

/// Read a config file as a raw TOML table
fn read_table(path: &Path) -> Result<toml::Table> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Overlay one table onto another; nested tables merge, other values replace
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let value = match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(value)) => {
                merge_tables(existing, value);
                continue;
            }
            (_, value) => value,
        };
        base.insert(key, value);
    }
}

/// Workflow file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowFormat {
    Toml,
    Yaml,
}

impl WorkflowFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Parse a workflow from a string without validating it
pub fn parse_workflow(contents: &str, format: WorkflowFormat) -> Result<Workflow> {
    let workflow = match format {
        WorkflowFormat::Toml => toml::from_str(contents)?,
        WorkflowFormat::Yaml => serde_yaml::from_str(contents)?,
    };
    Ok(workflow)
}

/// Load a workflow file and validate it against the known providers
pub fn load_workflow<'p, I>(path: &Path, known_providers: I) -> Result<Workflow>
where
    I: IntoIterator<Item = &'p str>,
{
    let format = WorkflowFormat::from_path(path).with_context(|| {
        format!(
            "unsupported workflow file '{}' (expected .toml, .yaml or .yml)",
            path.display()
        )
    })?;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let workflow = parse_workflow(&contents, format)
        .with_context(|| format!("parsing {}", path.display()))?;

    workflow.validate(known_providers).map_err(|errors| {
        anyhow::anyhow!(
            "workflow '{}' is invalid:\n  - {}",
            workflow.name,
            errors.join("\n  - ")
        )
    })?;

    tracing::debug!(
        path = %path.display(),
        agents = workflow.agents.len(),
        tasks = workflow.tasks.len(),
        "Loaded workflow"
    );

    Ok(workflow)
}
