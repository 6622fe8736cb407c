//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for sync results that give more
//! meaningful error messages than standard assertions.

use domain_sync::{SyncError, SyncOutcome, TagSet};

/// Asserts that a tag set holds exactly the given ids
pub fn assert_tags_eq(actual: &TagSet, expected: &[&str]) {
    let actual_ids: Vec<&str> = actual.iter().map(|t| t.as_str()).collect();
    let mut expected_ids = expected.to_vec();
    expected_ids.sort_unstable();
    expected_ids.dedup();
    assert_eq!(
        actual_ids, expected_ids,
        "Tag set mismatch: actual={}, expected={:?}",
        actual, expected
    );
}

/// Asserts that no tag in the set is empty or whitespace
pub fn assert_tags_valid(tags: &TagSet) {
    for tag in tags.iter() {
        assert!(tag.is_valid(), "Invalid tag id {:?} in {}", tag.as_str(), tags);
    }
}

/// Asserts that some audit note contains the given text
pub fn assert_note_contains(notes: &[String], needle: &str) {
    assert!(
        notes.iter().any(|n| n.contains(needle)),
        "No audit note contains {:?}; notes: {:#?}",
        needle,
        notes
    );
}

/// Unwraps a `Synced` outcome, panicking on anything else
pub fn expect_synced(result: Result<SyncOutcome, SyncError>) -> (core_kernel::ContactId, TagSet) {
    match result {
        Ok(SyncOutcome::Synced { contact_id, tags }) => (contact_id, tags),
        Ok(other) => panic!("Expected synced outcome, got {:?}", other),
        Err(e) => panic!("Expected synced outcome, got error: {}", e),
    }
}
