//! Browser configuration.

use browser_security::OriginPolicy;
use serde::{Deserialize, Serialize};
use web_apis::LocationConfig;

/// Browser configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserConfig {
    /// Location object settings.
    pub location: LocationConfig,
    /// Encoding label new documents start with.
    pub default_encoding: String,
    /// Whether committed documents finish loading immediately.
    pub complete_on_commit: bool,
}

impl BrowserConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for an embedding that hosts a single origin.
    pub fn single_origin() -> Self {
        Self {
            location: LocationConfig::single_origin(),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the origin policy.
    pub fn with_origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.location.origin_policy = policy;
        self
    }

    /// Set the default document encoding.
    pub fn with_default_encoding(mut self, label: &str) -> Self {
        self.default_encoding = label.to_string();
        self
    }

    /// Set whether committed documents finish loading immediately.
    pub fn with_complete_on_commit(mut self, complete: bool) -> Self {
        self.complete_on_commit = complete;
        self
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            location: LocationConfig::default(),
            default_encoding: "utf-8".to_string(),
            complete_on_commit: true,
        }
    }
}
