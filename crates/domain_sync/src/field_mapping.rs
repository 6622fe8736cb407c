//! Field Mapper
//!
//! Translates a plugin's raw field values (billing fields, submitted form
//! fields, posted profile fields) into canonical contact attributes using a
//! declarative, ordered [`FieldMapping`].
//!
//! Mapping is pure: only keys that are both declared in the mapping and
//! present in the source end up in the result, and absent keys are never
//! null-filled.

use serde::{Deserialize, Serialize};

use core_kernel::{Attributes, FieldValue};

use crate::field_registry::{is_email, FieldRegistry, FieldType};

/// One source key → canonical key entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapEntry {
    /// Key in the plugin's raw data
    pub source_key: String,
    /// Canonical attribute key (CRM field)
    pub target_key: String,
    /// Optional field type selecting the value transform
    #[serde(default, rename = "type")]
    pub field_type: Option<FieldType>,
}

/// Ordered field mapping, defined once per integration or per form feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    entries: Vec<FieldMapEntry>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an untyped entry
    pub fn map(mut self, source_key: impl Into<String>, target_key: impl Into<String>) -> Self {
        self.entries.push(FieldMapEntry {
            source_key: source_key.into(),
            target_key: target_key.into(),
            field_type: None,
        });
        self
    }

    /// Adds an entry whose value is formatted according to `field_type`
    pub fn map_typed(
        mut self,
        source_key: impl Into<String>,
        target_key: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        self.entries.push(FieldMapEntry {
            source_key: source_key.into(),
            target_key: target_key.into(),
            field_type: Some(field_type),
        });
        self
    }

    pub fn entries(&self) -> &[FieldMapEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fills in missing field types from the registry, keyed by canonical key
    pub fn with_registry_types(mut self, registry: &FieldRegistry) -> Self {
        for entry in self.entries.iter_mut().filter(|e| e.field_type.is_none()) {
            entry.field_type = registry.get(&entry.target_key).map(|d| d.field_type);
        }
        self
    }

    /// Maps source fields to canonical attributes
    ///
    /// Entries are applied in order, so when two entries share a canonical
    /// key the later one wins.
    pub fn apply(&self, source: &Attributes) -> Attributes {
        let mut mapped = Attributes::new();
        for entry in &self.entries {
            if let Some(value) = source.get(&entry.source_key) {
                mapped.insert(entry.target_key.clone(), format_entry(entry, value));
            }
        }
        mapped
    }

    /// Finds the email used for the contact lookup
    ///
    /// A valid email mapped onto the CRM lookup field wins. Otherwise the
    /// first valid email coming from an `email`-typed field is used.
    pub fn extract_email(&self, source: &Attributes, lookup_field: &str) -> Option<String> {
        let mut lookup_match = None;
        let mut first_email_field = None;

        for entry in &self.entries {
            let Some(value) = source.get(&entry.source_key) else {
                continue;
            };
            let formatted = format_entry(entry, value);
            let Some(text) = formatted.as_text().filter(|t| is_email(t)) else {
                continue;
            };

            if entry.target_key == lookup_field {
                lookup_match = Some(text.trim().to_string());
            } else if first_email_field.is_none() && entry.field_type == Some(FieldType::Email) {
                first_email_field = Some(text.trim().to_string());
            }
        }

        lookup_match.or(first_email_field)
    }
}

fn format_entry(entry: &FieldMapEntry, value: &FieldValue) -> FieldValue {
    match entry.field_type {
        Some(field_type) => field_type.format(value.clone()),
        None => value.clone(),
    }
}

impl FromIterator<FieldMapEntry> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = FieldMapEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
