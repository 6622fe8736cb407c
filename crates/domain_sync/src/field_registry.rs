//! Field types and the field descriptor registry
//!
//! Integrations declare which attributes they can sync by contributing
//! [`FieldDescriptor`]s, grouped under a [`FieldGroup`] per integration. The
//! registry is consulted by the field mapper to resolve value transforms for
//! mappings that do not carry an explicit field type, and is exposed to the
//! platform as the field catalog.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::ValidateEmail;

use core_kernel::FieldValue;

const TRUTHY: &[&str] = &["1", "true", "yes", "on", "checked"];
const FALSY: &[&str] = &["", "0", "false", "no", "off"];

/// Type of a syncable field, which selects the value transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Phone,
    Date,
    Checkbox,
    Multiselect,
    Int,
    Password,
    /// Any plugin-specific type without a dedicated transform
    #[serde(other)]
    Other,
}

impl FieldType {
    /// Formats a raw value for the CRM
    ///
    /// Pure and infallible: input the transform does not recognize is
    /// returned unchanged.
    pub fn format(&self, value: FieldValue) -> FieldValue {
        match (self, value) {
            (FieldType::Text | FieldType::Phone, FieldValue::Text(s)) => {
                FieldValue::Text(s.trim().to_string())
            }
            (FieldType::Email, FieldValue::Text(s)) => {
                FieldValue::Text(s.trim().to_lowercase())
            }
            (FieldType::Date, FieldValue::Text(s)) => match parse_date(&s) {
                Some(date) => FieldValue::Text(date.format("%Y-%m-%d").to_string()),
                None => FieldValue::Text(s),
            },
            (FieldType::Date, FieldValue::Integer(ts)) => match DateTime::<Utc>::from_timestamp(ts, 0) {
                Some(dt) => FieldValue::Text(dt.date_naive().format("%Y-%m-%d").to_string()),
                None => FieldValue::Integer(ts),
            },
            (FieldType::Checkbox, FieldValue::Text(s)) => {
                let normalized = s.trim().to_lowercase();
                if TRUTHY.contains(&normalized.as_str()) {
                    FieldValue::Bool(true)
                } else if FALSY.contains(&normalized.as_str()) {
                    FieldValue::Bool(false)
                } else {
                    FieldValue::Text(s)
                }
            }
            (FieldType::Checkbox, FieldValue::Integer(n)) if n == 0 || n == 1 => {
                FieldValue::Bool(n == 1)
            }
            (FieldType::Multiselect, FieldValue::Text(s)) => FieldValue::List(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            (FieldType::Int, FieldValue::Text(s)) => match s.trim().parse::<i64>() {
                Ok(n) => FieldValue::Integer(n),
                Err(_) => FieldValue::Text(s),
            },
            (_, value) => value,
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Returns true if the value is a syntactically valid email address
pub fn is_email(value: &str) -> bool {
    let candidate = value.trim().to_string();
    !candidate.is_empty() && candidate.validate_email()
}

/// A group of fields shown together in the field catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub slug: String,
    pub title: String,
}

impl FieldGroup {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
        }
    }
}

/// A syncable attribute contributed by an integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Canonical attribute key
    pub key: String,
    /// Human-readable label
    pub label: String,
    /// Field type, selects the value transform
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Group slug this field is listed under
    pub group: String,
    /// Pseudo fields are sent to the CRM but never loaded back from it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pseudo: bool,
}

impl FieldDescriptor {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        field_type: FieldType,
        group: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            group: group.into(),
            pseudo: false,
        }
    }

    /// Marks the field as pseudo (push-only)
    pub fn pseudo(mut self) -> Self {
        self.pseudo = true;
        self
    }

    /// Returns true if the field is both pushed to and loaded from the CRM
    pub fn synced_both_ways(&self) -> bool {
        !self.pseudo
    }
}

/// Registry of field groups and field descriptors, keyed by canonical key
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    groups: BTreeMap<String, FieldGroup>,
    fields: BTreeMap<String, FieldDescriptor>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field group, replacing any group with the same slug
    pub fn add_group(&mut self, group: FieldGroup) {
        self.groups.insert(group.slug.clone(), group);
    }

    /// Registers a field descriptor; a later registration for the same key wins
    pub fn register(&mut self, field: FieldDescriptor) {
        self.fields.insert(field.key.clone(), field);
    }

    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.get(key)
    }

    pub fn groups(&self) -> impl Iterator<Item = &FieldGroup> {
        self.groups.values()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    /// Returns the fields listed under the given group
    pub fn fields_in_group<'a>(&'a self, slug: &'a str) -> impl Iterator<Item = &'a FieldDescriptor> {
        self.fields.values().filter(move |f| f.group == slug)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
