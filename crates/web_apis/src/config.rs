//! Location object configuration.

use browser_security::OriginPolicy;
use serde::{Deserialize, Serialize};

/// A member reachable from cross-origin callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CrossOriginProperty {
    /// Operation exposed as a callable function.
    Method { name: String },
    /// Attribute exposed with its getter and/or setter.
    #[serde(rename_all = "kebab-case")]
    Attribute {
        name: String,
        needs_get: bool,
        needs_set: bool,
    },
}

impl CrossOriginProperty {
    pub fn method(name: &str) -> Self {
        CrossOriginProperty::Method { name: name.to_string() }
    }

    pub fn attribute(name: &str, needs_get: bool, needs_set: bool) -> Self {
        CrossOriginProperty::Attribute {
            name: name.to_string(),
            needs_get,
            needs_set,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CrossOriginProperty::Method { name } | CrossOriginProperty::Attribute { name, .. } => name,
        }
    }
}

/// Location object configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LocationConfig {
    /// How callers are compared against the owning document.
    pub origin_policy: OriginPolicy,
    /// Members visible to cross-origin callers.
    pub cross_origin_properties: Vec<CrossOriginProperty>,
}

impl LocationConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for embeddings that host a single origin.
    pub fn single_origin() -> Self {
        Self {
            origin_policy: OriginPolicy::SingleOrigin,
            ..Self::default()
        }
    }

    /// Set the origin policy.
    pub fn with_origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.origin_policy = policy;
        self
    }

    /// Expose an additional member to cross-origin callers.
    pub fn with_cross_origin_property(mut self, property: CrossOriginProperty) -> Self {
        self.cross_origin_properties.push(property);
        self
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            origin_policy: OriginPolicy::Enforced,
            cross_origin_properties: vec![
                CrossOriginProperty::attribute("href", false, true),
                CrossOriginProperty::method("replace"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_surface() {
        let config = LocationConfig::default();
        let names: Vec<&str> = config.cross_origin_properties.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["href", "replace"]);
        assert_eq!(config.origin_policy, OriginPolicy::Enforced);
    }

    #[test]
    fn test_from_json() {
        let config: LocationConfig = serde_json::from_str(
            r#"{
                "origin-policy": "single-origin",
                "cross-origin-properties": [
                    { "kind": "attribute", "name": "href", "needs-get": false, "needs-set": true },
                    { "kind": "method", "name": "reload" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.origin_policy, OriginPolicy::SingleOrigin);
        assert_eq!(config.cross_origin_properties[1], CrossOriginProperty::method("reload"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: LocationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LocationConfig::default());
    }
}
