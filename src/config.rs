//! Configuration management for schema flattening
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (shapes.toml)
//! - Environment variables (SHAPES__*)
//!
//! ## Example config file (shapes.toml):
//! ```toml
//! [general]
//! prefix = "pr"
//! base = "Product"
//! embed_threshold = 10
//! default_max_length = 150
//!
//! [primary_keys]
//! Product = "productId"
//!
//! [[aliases]]
//! pattern = "Identifier"
//! replacement = "Id"
//!
//! [[ontologies]]
//! prefix = "alias"
//! name = "Alias"
//! description = "Physical column names"
//! uri = "http://example.com/ns/alias/"
//!
//! [settings.datasource]
//! value = "AwsAurora(AwsTableName:\"{table}\")"
//! ```
//!
//! Defaults: no prefix, no base, `embed_threshold = 10`,
//! `default_max_length = 150`, `max_depth = 64`, `synthetic_keys = true`,
//! `synthetic_key_name = "stageId"`, `order_index_name = "orderIndex"`.

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, ShapeError};
use crate::naming::NameTransformer;

/// Lower bound shared by synthetic keys and integer properties without `minimum`
pub const DEFAULT_MIN_INCLUSIVE: i64 = 0;

/// Upper bound shared by synthetic keys and integer properties without `maximum`
pub const DEFAULT_MAX_EXCLUSIVE: i64 = 4_294_967_295;

/// Main configuration for the shape generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapesConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Root shape name -> natural primary key property
    #[serde(default)]
    pub primary_keys: BTreeMap<String, String>,

    /// Alias rewrite rules, applied in order
    #[serde(default)]
    pub aliases: Vec<AliasRule>,

    /// Ontology metadata for output adapters
    #[serde(default)]
    pub ontologies: Vec<OntologyConfig>,

    /// Named settings passed through to output adapters
    #[serde(default)]
    pub settings: BTreeMap<String, SettingConfig>,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Namespace prefix for generated shape ids
    #[serde(default)]
    pub prefix: Option<String>,

    /// Name of the root shape
    #[serde(default)]
    pub base: Option<String>,

    /// Nested objects with at most this many properties are inlined
    #[serde(default = "default_embed_threshold")]
    pub embed_threshold: usize,

    /// `maxLength` used for strings that declare none
    #[serde(default = "default_max_length")]
    pub default_max_length: u64,

    /// Maximum schema nesting depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Add synthetic keys to shapes without an `id` property
    #[serde(default = "default_true")]
    pub synthetic_keys: bool,

    /// Reserved property name for synthetic keys
    #[serde(default = "default_synthetic_key_name")]
    pub synthetic_key_name: String,

    /// Property name for the order index of array-derived shapes
    #[serde(default = "default_order_index_name")]
    pub order_index_name: String,
}

/// A single alias rewrite rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    /// Regex matched against identifier names
    pub pattern: String,
    /// Replacement text (`$1` style group references allowed)
    #[serde(default)]
    pub replacement: String,
}

/// Ontology metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyConfig {
    /// Short prefix (e.g. "alias")
    pub prefix: String,
    /// Ontology name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Namespace URI
    #[serde(default)]
    pub uri: String,
}

/// Opaque named setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingConfig {
    pub value: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
}

// Default value functions
fn default_embed_threshold() -> usize {
    10
}

fn default_max_length() -> u64 {
    150
}

fn default_max_depth() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_synthetic_key_name() -> String {
    "stageId".to_string()
}

fn default_order_index_name() -> String {
    "orderIndex".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            base: None,
            embed_threshold: default_embed_threshold(),
            default_max_length: default_max_length(),
            max_depth: default_max_depth(),
            synthetic_keys: true,
            synthetic_key_name: default_synthetic_key_name(),
            order_index_name: default_order_index_name(),
        }
    }
}

impl ShapesConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["shapes.toml", ".shapes.toml", "config/shapes.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "shapes", "schema-shapes") {
            let xdg_config = config_dir.config_dir().join("shapes.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SHAPES")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Primary key configured for a root shape.
    ///
    /// File sources may fold key case, so an exact match is tried first.
    pub fn primary_key_for(&self, base: &str) -> Option<&str> {
        self.primary_keys
            .get(base)
            .or_else(|| {
                self.primary_keys
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(base))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Look up a pass-through setting
    pub fn setting(&self, name: &str) -> Option<&SettingConfig> {
        self.settings.get(name)
    }

    /// Resolve the immutable options used by a flattening run.
    ///
    /// Fails when no base shape name is configured.
    pub fn flatten_options(&self) -> Result<FlattenOptions> {
        let base = self
            .general
            .base
            .clone()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| ShapeError::MissingConfig("no base shape name (general.base)".into()))?;

        let names = NameTransformer::new(&self.aliases)?;
        let primary_key = self.primary_key_for(&base).map(str::to_string);

        Ok(FlattenOptions {
            base,
            prefix: self.general.prefix.clone().filter(|p| !p.is_empty()),
            primary_key,
            names,
            embed_threshold: self.general.embed_threshold,
            default_max_length: self.general.default_max_length,
            max_depth: self.general.max_depth,
            synthetic_keys: self.general.synthetic_keys,
            synthetic_key_name: self.general.synthetic_key_name.clone(),
            order_index_name: self.general.order_index_name.clone(),
        })
    }
}

/// Immutable options for one flattening run, built once and shared by every pass
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    pub base: String,
    pub prefix: Option<String>,
    pub primary_key: Option<String>,
    pub names: NameTransformer,
    pub embed_threshold: usize,
    pub default_max_length: u64,
    pub max_depth: usize,
    pub synthetic_keys: bool,
    pub synthetic_key_name: String,
    pub order_index_name: String,
}

impl FlattenOptions {
    /// Options with defaults for the given root shape name
    pub fn new(base: impl Into<String>) -> Self {
        let general = GeneralConfig::default();
        Self {
            base: base.into(),
            prefix: None,
            primary_key: None,
            names: NameTransformer::default(),
            embed_threshold: general.embed_threshold,
            default_max_length: general.default_max_length,
            max_depth: general.max_depth,
            synthetic_keys: general.synthetic_keys,
            synthetic_key_name: general.synthetic_key_name,
            order_index_name: general.order_index_name,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    pub fn with_embed_threshold(mut self, threshold: usize) -> Self {
        self.embed_threshold = threshold;
        self
    }

    pub fn with_names(mut self, names: NameTransformer) -> Self {
        self.names = names;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn without_synthetic_keys(mut self) -> Self {
        self.synthetic_keys = false;
        self
    }
}
