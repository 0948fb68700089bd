//! The import phases: projects to events, albums to collections, keywords to XMP.

pub mod collections;
pub mod dedup;
pub mod hierarchy;
pub mod metadata;
pub mod project;

use std::collections::HashMap;

use serde::Serialize;

use crate::library::NodeId;

/// Translation table from source master UUID to destination file node.
///
/// Entries are write-once: a UUID mapped by an earlier phase is never remapped.
/// A missing entry means the master is not (yet) available in the library.
#[derive(Debug, Clone, Default)]
pub struct FileNodes {
    map: HashMap<String, NodeId>,
}

impl FileNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, master_uuid: &str) -> Option<NodeId> {
        self.map.get(master_uuid).copied()
    }

    pub fn contains(&self, master_uuid: &str) -> bool {
        self.map.contains_key(master_uuid)
    }

    /// Map `master_uuid` to `node` unless it is already mapped. Returns whether it was inserted.
    pub fn insert(&mut self, master_uuid: &str, node: NodeId) -> bool {
        if self.map.contains_key(master_uuid) {
            return false;
        }
        self.map.insert(master_uuid.to_string(), node);
        true
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Counters collected across all phases of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub events_created: usize,
    pub events_skipped: usize,
    pub files_imported: usize,
    pub files_matched: usize,
    pub files_failed: usize,
    pub referenced_skipped: usize,
    pub missing_masters: usize,
    pub hidden: usize,
    pub groups_created: usize,
    pub groups_reused: usize,
    pub collections_created: usize,
    pub collections_reused: usize,
    pub albums_skipped: usize,
    pub memberships: usize,
    pub metadata_written: usize,
    pub metadata_failed: usize,
    pub keywords_skipped: usize,
}

impl ImportReport {
    /// True when no item was skipped or failed along the way.
    pub fn is_clean(&self) -> bool {
        self.files_failed == 0
            && self.referenced_skipped == 0
            && self.missing_masters == 0
            && self.albums_skipped == 0
            && self.metadata_failed == 0
            && self.keywords_skipped == 0
    }

    /// Label/value pairs in display order.
    pub fn rows(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("Events created", self.events_created),
            ("Projects already imported", self.events_skipped),
            ("Files imported", self.files_imported),
            ("Files already in library", self.files_matched),
            ("Files failed", self.files_failed),
            ("Referenced files skipped", self.referenced_skipped),
            ("Missing masters", self.missing_masters),
            ("Hidden files", self.hidden),
            ("Groups created", self.groups_created),
            ("Groups reused", self.groups_reused),
            ("Collections created", self.collections_created),
            ("Collections reused", self.collections_reused),
            ("Albums skipped", self.albums_skipped),
            ("Collection memberships", self.memberships),
            ("Metadata written", self.metadata_written),
            ("Metadata failed", self.metadata_failed),
            ("Keywords skipped", self.keywords_skipped),
        ]
    }
}
