//! Engine and compile configuration.

use serde::{Deserialize, Serialize};

use crate::error::SocketError;

/// What to do with override groups that no extension point consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnusedOverridePolicy {
    /// Report a `Diagnostic` and keep rendering.
    #[default]
    Warn,
    /// Abort the pass with `SocketError::UnrecognizedOverride`.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Shared by the boundary and accessor protocols.
    pub unused_overrides: UnusedOverridePolicy,
    /// Attributes that merge mode concatenates instead of overwriting.
    pub list_attributes: Vec<String>,
    /// Distinct declaration lists whose grouping a renderer keeps.
    pub group_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unused_overrides: UnusedOverridePolicy::Warn,
            list_attributes: vec!["class".to_string(), "className".to_string()],
            group_cache_capacity: crate::cache::DEFAULT_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn strict() -> Self {
        Self {
            unused_overrides: UnusedOverridePolicy::Error,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SocketError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_list_attribute(&self, name: &str) -> bool {
        self.list_attributes.iter().any(|a| a == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// Document name, usually the file stem.
    pub name: String,
    /// Overrides the socket namespace derived from `name`.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Wrap body content in a `div` carrying the body's attributes.
    #[serde(default = "default_wrap_body")]
    pub wrap_body: bool,
}

fn default_wrap_body() -> bool {
    true
}

impl CompileOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            wrap_body: true,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SocketError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.is_list_attribute("class"));
        assert!(!config.is_list_attribute("style"));
    }

    #[test]
    fn test_engine_config_policy_flag() {
        let config = EngineConfig::from_json(r#"{"unusedOverrides":"error"}"#).unwrap();
        assert_eq!(config.unused_overrides, UnusedOverridePolicy::Error);
        assert_eq!(config, EngineConfig::strict());

        let config = EngineConfig::from_json(r#"{"groupCacheCapacity":4}"#).unwrap();
        assert_eq!(config.group_cache_capacity, 4);
    }

    #[test]
    fn test_compile_options_from_json() {
        let opts = CompileOptions::from_json(r#"{"name":"index"}"#).unwrap();
        assert_eq!(opts, CompileOptions::new("index"));

        let err = CompileOptions::from_json(r#"{"wrapBody":false}"#).unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_CONFIG);
    }
}
