//! Replica registry: which instances receive pushes, and under which
//! policy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Policy;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicaRegistry {
    #[serde(default)]
    pub replicas: Vec<ReplicaEntry>,
}

impl ReplicaRegistry {
    pub fn from_toml_str(input: &str) -> Result<Self, RegistryError> {
        let registry: ReplicaRegistry = toml::from_str(input)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn replica(&self, name: &str) -> Option<&ReplicaEntry> {
        self.replicas.iter().find(|entry| entry.name == name)
    }

    /// Entries the dispatcher should run workers for.
    pub fn active(&self) -> impl Iterator<Item = &ReplicaEntry> {
        self.replicas.iter().filter(|entry| entry.active)
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut names = BTreeSet::new();
        for entry in &self.replicas {
            validate_name(&entry.name)?;
            if !names.insert(entry.name.as_str()) {
                return Err(RegistryError::DuplicateName {
                    name: entry.name.clone(),
                });
            }
            if !(entry.url.starts_with("http://") || entry.url.starts_with("https://")) {
                return Err(RegistryError::InvalidUrl {
                    name: entry.name.clone(),
                    url: entry.url.clone(),
                });
            }
        }
        Ok(())
    }
}

/// One registered replica. `policy` bounds what may ever be pushed to
/// `url`; `active` gates whether a worker runs at all.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicaEntry {
    pub name: String,
    pub url: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub policy: Policy,
}

fn default_active() -> bool {
    true
}

// Names key cursor files on disk, so keep them filename-safe.
fn validate_name(name: &str) -> Result<(), RegistryError> {
    let ok = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(RegistryError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("replica registry parse failed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate replica name {name}")]
    DuplicateName { name: String },
    #[error("invalid replica name `{name}`: must be 1-64 chars of [a-z0-9_-]")]
    InvalidName { name: String },
    #[error("replica {name} has invalid endpoint url `{url}`")]
    InvalidUrl { name: String, url: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TemplateId;

    #[test]
    fn parses_registry_with_defaults() {
        let input = r#"
[[replicas]]
name = "alpha"
url = "https://replica.example.org"

[replicas.policy.templates.t1]
properties = ["p1", "p2"]

[[replicas]]
name = "beta"
url = "http://10.0.0.2:3000"
active = false
"#;

        let registry = ReplicaRegistry::from_toml_str(input).unwrap();
        assert_eq!(registry.replicas.len(), 2);

        let alpha = registry.replica("alpha").unwrap();
        assert!(alpha.active);
        let rule = alpha
            .policy
            .template_rule(&TemplateId::parse("t1").unwrap())
            .unwrap();
        assert_eq!(rule.properties.len(), 2);

        let active: Vec<_> = registry.active().map(|r| r.name.as_str()).collect();
        assert_eq!(active, ["alpha"]);
    }

    #[test]
    fn parses_entity_filter_predicates() {
        let input = r#"
[[replicas]]
name = "alpha"
url = "https://replica.example.org"

[replicas.policy.templates.t1]
properties = ["p1"]
filter = { "metadata.campaign" = "north" }
"#;

        let registry = ReplicaRegistry::from_toml_str(input).unwrap();
        let rule = registry.replicas[0]
            .policy
            .template_rule(&TemplateId::parse("t1").unwrap())
            .unwrap();
        assert_eq!(
            rule.filter,
            Some(serde_json::json!({ "metadata.campaign": "north" }))
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let input = r#"
[[replicas]]
name = "alpha"
url = "https://a.example.org"

[[replicas]]
name = "alpha"
url = "https://b.example.org"
"#;
        let err = ReplicaRegistry::from_toml_str(input).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }

    #[test]
    fn rejects_unsafe_names() {
        for name in ["", "Alpha", "a b", "../alpha"] {
            let registry = ReplicaRegistry {
                replicas: vec![ReplicaEntry {
                    name: name.to_string(),
                    url: "https://a.example.org".to_string(),
                    active: true,
                    policy: Policy::default(),
                }],
            };
            assert!(
                matches!(registry.validate(), Err(RegistryError::InvalidName { .. })),
                "{name:?}"
            );
        }
    }

    #[test]
    fn rejects_non_http_urls() {
        let registry = ReplicaRegistry {
            replicas: vec![ReplicaEntry {
                name: "alpha".to_string(),
                url: "ftp://a.example.org".to_string(),
                active: true,
                policy: Policy::default(),
            }],
        };
        assert!(matches!(
            registry.validate(),
            Err(RegistryError::InvalidUrl { .. })
        ));
    }
}
