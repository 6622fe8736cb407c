//! Tag Resolver
//!
//! Computes the tags applied to (or removed from) a contact for an event by
//! merging the global tag configuration with per-line-item overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use core_kernel::{ItemId, PortError, TagId};

use crate::entity::LineItem;
use crate::ports::TagConfigPort;

/// A deduplicated set of valid tag identifiers
///
/// Construction always drops empty or whitespace-only identifiers, so a
/// `TagSet` handed to the CRM never contains falsy tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TagId>", into = "Vec<TagId>")]
pub struct TagSet(BTreeSet<TagId>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag, ignoring invalid identifiers
    ///
    /// Surrounding whitespace is stripped, so `" T1 "` and `"T1"` are the
    /// same member.
    pub fn insert(&mut self, tag: TagId) -> bool {
        let trimmed = tag.as_str().trim();
        if trimmed.is_empty() {
            return false;
        }
        let tag = if trimmed.len() == tag.as_str().len() {
            tag
        } else {
            TagId::new(trimmed)
        };
        self.0.insert(tag)
    }

    /// Unions another collection of tags into this set
    pub fn extend<I: IntoIterator<Item = TagId>>(&mut self, tags: I) {
        for tag in tags {
            self.insert(tag);
        }
    }

    pub fn contains(&self, tag: &TagId) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagId> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<TagId> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<TagId> for TagSet {
    fn from_iter<I: IntoIterator<Item = TagId>>(iter: I) -> Self {
        let mut set = TagSet::new();
        set.extend(iter);
        set
    }
}

impl From<Vec<TagId>> for TagSet {
    fn from(tags: Vec<TagId>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<TagSet> for Vec<TagId> {
    fn from(tags: TagSet) -> Self {
        tags.0.into_iter().collect()
    }
}

impl IntoIterator for TagSet {
    type Item = TagId;
    type IntoIter = std::collections::btree_set::IntoIter<TagId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.0.iter().map(TagId::as_str).collect();
        write!(f, "[{}]", tags.join(", "))
    }
}

/// Per-item tag configuration (the product's sync settings)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTagConfig {
    /// Tags applied when the item is purchased and removed on refund
    #[serde(default)]
    pub apply_tags: Vec<TagId>,
}

/// Merges global tags with each item's tags into one valid, deduplicated set
pub fn resolve_tags<G, I, T>(global: G, per_item: I) -> TagSet
where
    G: IntoIterator<Item = TagId>,
    I: IntoIterator<Item = T>,
    T: IntoIterator<Item = TagId>,
{
    let mut tags: TagSet = global.into_iter().collect();
    for item_tags in per_item {
        tags.extend(item_tags);
    }
    tags
}

/// Resolves tags by looking up each line item's tag configuration
#[derive(Clone)]
pub struct TagResolver {
    tag_config: Arc<dyn TagConfigPort>,
}

impl TagResolver {
    pub fn new(tag_config: Arc<dyn TagConfigPort>) -> Self {
        Self { tag_config }
    }

    /// Returns the union of `global` and the configured tags of every line item
    ///
    /// Items without configuration contribute nothing. The same call with an
    /// empty `global` set yields the tags to remove on a refund.
    pub async fn resolve(&self, global: &TagSet, items: &[LineItem]) -> Result<TagSet, PortError> {
        let mut per_item = Vec::with_capacity(items.len());
        for item_id in unique_items(items) {
            if let Some(config) = self.tag_config.tag_config(item_id).await? {
                per_item.push(config.apply_tags);
            }
        }
        Ok(resolve_tags(global.iter().cloned(), per_item))
    }
}

fn unique_items(items: &[LineItem]) -> BTreeSet<ItemId> {
    items.iter().map(|item| item.item_id).collect()
}

impl fmt::Debug for TagResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::MockTagConfig;

    fn tags(ids: &[&str]) -> Vec<TagId> {
        ids.iter().map(|t| TagId::from(*t)).collect()
    }

    #[test]
    fn test_resolve_tags_unions_and_dedupes() {
        let resolved = resolve_tags(tags(&["T3"]), vec![tags(&["T1", "T2"]), tags(&["T2", "T3"])]);
        assert_eq!(resolved.to_vec(), tags(&["T1", "T2", "T3"]));
    }

    #[test]
    fn test_resolve_tags_drops_empty_ids() {
        let resolved = resolve_tags(tags(&["", "  "]), vec![tags(&["T1", ""])]);
        assert_eq!(resolved.to_vec(), tags(&["T1"]));
    }

    #[test]
    fn test_padded_ids_collapse_onto_trimmed_id() {
        let resolved = resolve_tags(tags(&["T1"]), vec![tags(&[" T1 ", "T2\t"])]);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.to_vec(), tags(&["T1", "T2"]));
    }

    #[test]
    fn test_deserialized_tag_set_is_filtered() {
        let set: TagSet = serde_json::from_str(r#"["T1", "", "T1", "T2"]"#).unwrap();
        assert_eq!(set.to_vec(), tags(&["T1", "T2"]));
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["T1","T2"]"#);
    }

    #[test]
    fn test_tag_set_display() {
        let set: TagSet = tags(&["b", "a"]).into_iter().collect();
        assert_eq!(set.to_string(), "[a, b]");
    }

    #[tokio::test]
    async fn test_resolver_looks_up_each_item_once() {
        let config = Arc::new(MockTagConfig::new());
        config.set(ItemId::new(10), tags(&["T1", "T2"])).await;
        let resolver = TagResolver::new(config.clone());

        let items = vec![
            LineItem::new(ItemId::new(10), 1),
            LineItem::new(ItemId::new(10), 2),
            LineItem::new(ItemId::new(11), 1),
        ];
        let global: TagSet = tags(&["T3"]).into_iter().collect();
        let resolved = resolver.resolve(&global, &items).await.unwrap();

        assert_eq!(resolved.to_vec(), tags(&["T1", "T2", "T3"]));
        assert_eq!(config.lookups().await, 2);
    }
}
