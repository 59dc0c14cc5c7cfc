//! Record types
//!
//! The crawler knows nothing about a record beyond its key. Fields are a
//! fixed, configured list of names; values are plain text.

use crate::config::ParserConfig;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name to value map produced by a page parser
pub type RawRecord = BTreeMap<String, String>;

/// A single record that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("empty key field '{0}'")]
    EmptyKey(String),
}

/// Field layout shared by parser output and the record sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    key_field: String,
    fields: Vec<String>,
    required: Vec<String>,
}

impl RecordSchema {
    pub fn new(key_field: impl Into<String>, fields: Vec<String>, required: Vec<String>) -> Self {
        Self {
            key_field: key_field.into(),
            fields,
            required,
        }
    }

    /// Schema implied by the parser's column configuration
    pub fn from_parser_config(config: &ParserConfig) -> Self {
        Self::new(
            config.key_field.clone(),
            config.field_names(),
            config
                .columns
                .iter()
                .filter(|c| c.required)
                .map(|c| c.name.clone())
                .collect(),
        )
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Ordered field names
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// A parsed output record identified by its unique key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

impl Record {
    /// Validates a raw record against the schema
    ///
    /// Unknown fields are dropped and absent optional fields become empty
    /// strings, so every stored record has exactly the schema's fields.
    pub fn from_raw(mut raw: RawRecord, schema: &RecordSchema) -> Result<Self, RecordError> {
        let key = match raw.get(&schema.key_field) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            Some(_) => return Err(RecordError::EmptyKey(schema.key_field.clone())),
            None => return Err(RecordError::MissingField(schema.key_field.clone())),
        };

        for name in &schema.required {
            if raw.get(name).map(|v| v.trim().is_empty()).unwrap_or(true) {
                return Err(RecordError::MissingField(name.clone()));
            }
        }

        let fields = schema
            .fields
            .iter()
            .map(|name| (name.clone(), raw.remove(name).unwrap_or_default()))
            .collect();

        Ok(Self { key, fields })
    }
}
