//! Property-Based Test Generators
//!
//! Provides proptest strategies for field maps, source fields and tag
//! configurations, including the blank and duplicate values the mapper and
//! resolver must cope with.

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

use core_kernel::{Attributes, FieldValue, TagId};
use domain_sync::{FieldMapEntry, FieldMapping, FieldType};

/// Strategy for tag ids, including empty and whitespace-only ones
pub fn tag_id_strategy() -> impl Strategy<Value = TagId> {
    prop_oneof![
        4 => "[A-Z][0-9]{1,2}".prop_map(TagId::from),
        1 => "[A-Z][0-9]{1,2}".prop_map(|t| TagId::from(format!(" {} ", t))),
        1 => Just(TagId::from("")),
        1 => " {1,3}".prop_map(TagId::from),
    ]
}

/// Strategy for a list of tag ids with likely duplicates
pub fn tag_list_strategy() -> impl Strategy<Value = Vec<TagId>> {
    vec(tag_id_strategy(), 0..8)
}

/// Strategy for per-item tag lists
pub fn per_item_tags_strategy() -> impl Strategy<Value = Vec<Vec<TagId>>> {
    vec(tag_list_strategy(), 0..5)
}

/// Strategy for field keys drawn from a small alphabet so keys collide
pub fn field_key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

pub fn field_type_strategy() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::Text),
        Just(FieldType::Email),
        Just(FieldType::Phone),
        Just(FieldType::Date),
        Just(FieldType::Checkbox),
        Just(FieldType::Multiselect),
        Just(FieldType::Int),
        Just(FieldType::Password),
        Just(FieldType::Other),
    ]
}

pub fn field_value_strategy() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i64>().prop_map(FieldValue::Integer),
        ".{0,12}".prop_map(FieldValue::Text),
        vec("[a-z]{0,4}", 0..3).prop_map(FieldValue::List),
    ]
}

/// Strategy for raw source fields
pub fn source_fields_strategy() -> impl Strategy<Value = Attributes> {
    btree_map(field_key_strategy(), field_value_strategy(), 0..8)
}

/// Strategy for field mappings, optionally typed
pub fn field_mapping_strategy() -> impl Strategy<Value = FieldMapping> {
    vec(
        (field_key_strategy(), field_key_strategy(), proptest::option::of(field_type_strategy())),
        0..8,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(source_key, target_key, field_type)| FieldMapEntry {
                source_key,
                target_key: format!("crm_{}", target_key),
                field_type,
            })
            .collect()
    })
}
