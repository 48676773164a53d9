//! Workspace configuration (`.gview/config.toml`)

use anyhow::{Context, Result};
use gv_core::{ChangePolicy, EngineOptions, Schema};
use gv_source::DEFAULT_MAX_OUTPUT_BYTES;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub schema: Schema,
}

/// `[query]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Shell command printing one JSON record per line
    pub command: String,
    /// Period of `gview watch` (10-86400)
    pub interval_secs: u64,
    /// Query output cap in bytes
    pub max_output_bytes: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            interval_secs: 300,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// `[tree]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Path of the field identifying an entity
    pub key_field: Option<String>,
    pub filter_case_sensitive: bool,
    pub change_policy: ChangePolicy,
    pub expand_by_default: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            key_field: Some("number".to_string()),
            filter_case_sensitive: false,
            change_policy: ChangePolicy::Acknowledge,
            expand_by_default: false,
        }
    }
}

impl TreeConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            key_field: self.key_field.clone(),
            filter_case_sensitive: self.filter_case_sensitive,
            change_policy: self.change_policy,
            expand_by_default: self.expand_by_default,
        }
    }
}

impl Config {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(10..=86400).contains(&self.query.interval_secs) {
            anyhow::bail!(
                "query.interval_secs must be between 10 and 86400 (got {})",
                self.query.interval_secs
            );
        }
        if self.query.max_output_bytes < 1024 {
            anyhow::bail!(
                "query.max_output_bytes must be at least 1024 (got {})",
                self.query.max_output_bytes
            );
        }
        if let Some(key) = &self.tree.key_field {
            if key.trim().is_empty() {
                anyhow::bail!("tree.key_field must not be empty (omit it to disable change detection)");
            }
        }
        Ok(())
    }

    /// Look up one value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "query.command" => self.query.command.clone(),
            "query.interval_secs" => self.query.interval_secs.to_string(),
            "query.max_output_bytes" => self.query.max_output_bytes.to_string(),
            "tree.key_field" => self.tree.key_field.clone().unwrap_or_default(),
            "tree.filter_case_sensitive" => self.tree.filter_case_sensitive.to_string(),
            "tree.change_policy" => policy_name(self.tree.change_policy).to_string(),
            "tree.expand_by_default" => self.tree.expand_by_default.to_string(),
            "schema.levels" => self.schema.levels.len().to_string(),
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'gview config list' to see available keys.",
                key
            ),
        };
        Ok(value)
    }
}

pub fn policy_name(policy: ChangePolicy) -> &'static str {
    match policy {
        ChangePolicy::Acknowledge => "acknowledge",
        ChangePolicy::AutoClear => "auto-clear",
    }
}

/// Config written by `gview init`
pub fn example_config() -> &'static str {
    r#"# gview configuration

[query]
# Shell command printing one JSON record per line
command = "ssh -p 29418 review.example.com gerrit query status:open --format JSON --all-approvals"
# Refresh period for `gview watch` (10-86400)
interval_secs = 300
# Fail the query when its output exceeds this many bytes
max_output_bytes = 204800

[tree]
# Field identifying one record across refreshes
key_field = "number"
filter_case_sensitive = false
# "acknowledge": changes stay flagged until `gview ack`
# "auto-clear": flags also clear when the record is unchanged next refresh
change_policy = "acknowledge"
expand_by_default = false

# Level 0 holds the roots; each later level names the property of the
# previous level its nodes attach under.
[[schema.levels]]
children = ["project"]

[[schema.levels]]
parent = "project"
children = [
    { property = "number", format = "${number}: ${subject}", tooltip = "${owner.name}", tracks_changes = true, has_context_menu = true, icon = { property = "status", cases = { NEW = "open", MERGED = "merged", ABANDONED = "abandoned" }, default = "change" } },
]

[[schema.levels]]
parent = "number"
children = [
    { property = "patchSets.approvals.value", formatter = "score", tooltip = "${patchSets.approvals.by.name}" },
]
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use gv_core::FormatterRegistry;

    #[test]
    fn test_example_config_is_valid() {
        let config: Config = toml::from_str(example_config()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.query.interval_secs, 300);
        assert_eq!(config.tree.key_field.as_deref(), Some("number"));
        assert_eq!(config.schema.levels.len(), 3);
        config
            .schema
            .compile(&FormatterRegistry::with_builtins())
            .unwrap();
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = toml::from_str("[query]\ncommand = \"cat batch.jsonl\"\n").unwrap();
        assert_eq!(config.query.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
        assert_eq!(config.tree, TreeConfig::default());
        assert!(config.schema.levels.is_empty());
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = Config::default();
        config.validate().unwrap();

        config.query.interval_secs = 5;
        assert!(config.validate().is_err());
        config.query.interval_secs = 86400;
        config.validate().unwrap();

        config.query.max_output_bytes = 10;
        assert!(config.validate().is_err());
        config.query.max_output_bytes = 4096;

        config.tree.key_field = Some(" ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_change_policy_names() {
        let config: Config = toml::from_str("[tree]\nchange_policy = \"auto-clear\"\n").unwrap();
        assert_eq!(config.tree.change_policy, ChangePolicy::AutoClear);
        assert_eq!(config.get("tree.change_policy").unwrap(), "auto-clear");
        assert!(config.get("nope").is_err());
    }
}
