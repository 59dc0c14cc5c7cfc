use crate::domain::UnitKey;
use crate::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Hierarchical description of the query space
///
/// ```json
/// {
///   "dimensions": ["division_id", "district_id"],
///   "groups": [
///     { "id": "3", "name": "Dhaka", "items": [ { "id": "26", "name": "Gazipur" } ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DomainDescription {
    /// Query parameter names for the group and item levels
    pub dimensions: [String; 2],

    pub groups: Vec<DomainGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<DomainItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainItem {
    pub id: String,
    pub name: String,
}

impl DomainDescription {
    /// Parses and validates a description from JSON text
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let domain: DomainDescription = serde_json::from_str(content)?;
        domain.validate()?;
        Ok(domain)
    }

    /// Number of leaf units the description expands to
    pub fn unit_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    /// All unit keys in file order
    pub fn keys(&self) -> impl Iterator<Item = UnitKey> + '_ {
        self.groups.iter().flat_map(|group| {
            group
                .items
                .iter()
                .map(move |item| UnitKey::new(group.id.clone(), item.id.clone()))
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let [parent, child] = &self.dimensions;
        if parent.is_empty() || child.is_empty() {
            return Err(ConfigError::Validation(
                "domain dimension names cannot be empty".to_string(),
            ));
        }
        if parent == child {
            return Err(ConfigError::Validation(format!(
                "domain dimension names must differ, got '{}' twice",
                parent
            )));
        }

        let mut seen = HashSet::new();
        for key in self.keys() {
            if !seen.insert(key.clone()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate unit {} in domain description",
                    key
                )));
            }
        }

        Ok(())
    }
}

/// Loads the domain description from disk
///
/// A missing or malformed description is fatal: nothing can be dispatched
/// without it.
pub fn load_domain(path: &Path) -> Result<DomainDescription, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    DomainDescription::from_json(&content)
}
