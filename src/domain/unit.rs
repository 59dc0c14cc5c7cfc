use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one work unit
///
/// Kept as two named parts rather than a joined string so identifiers that
/// contain separator characters can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    pub parent: String,
    pub child: String,
}

impl UnitKey {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.child)
    }
}

/// One combination of query dimensions to paginate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub key: UnitKey,

    /// Query parameter name and value pairs, outermost dimension first
    pub dimensions: Vec<(String, String)>,

    /// Human readable name, e.g. "Dhaka > Gazipur"
    pub label: String,

    /// First page this run should request
    pub start_page: u32,
}
