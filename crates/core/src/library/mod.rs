//! Destination library capability.
//!
//! The importer only talks to the destination through the [`Library`] trait.
//! [`store::LibraryStore`] is the SQLite-backed implementation used by the CLI.

pub mod files;
pub mod schema;
pub mod store;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::import::metadata::MetadataBlock;

pub use store::LibraryStore;

/// Identifier of a node in the destination library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    /// Flat container, one per imported project.
    Event,
    /// Hierarchical container mirroring a plain folder.
    Group,
    /// Flat container mirroring an album.
    Collection,
    /// One imported or matched physical file.
    File,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Event => "Event",
            NodeKind::Group => "Group",
            NodeKind::Collection => "Collection",
            NodeKind::File => "File",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub caption: String,
}

/// Where groups and collections are looked up and created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Direct children of the library root.
    Root,
    /// Children of a group.
    Group(NodeId),
}

/// A file queued for import together with its precomputed fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub path: PathBuf,
    pub fingerprint: String,
    /// Files with the same key are one photo in several encodings (RAW+JPEG) and
    /// may share a stem, and so a sidecar, inside an event directory.
    pub pair_key: Option<String>,
}

/// The capabilities the importer needs from a destination library.
pub trait Library {
    /// Groups and collections directly under `scope`, in creation order.
    fn children(&self, scope: Scope) -> Result<Vec<Node>>;

    fn create_group(&mut self, caption: &str, scope: Scope) -> Result<NodeId>;

    fn create_collection(&mut self, caption: &str, scope: Scope) -> Result<NodeId>;

    fn create_event(&mut self, name: &str) -> Result<NodeId>;

    /// Import `files` into `event`. The result is positional: entry `i` is the node
    /// created for `files[i]`, or `None` if that one file failed. An `Err` means the
    /// whole batch failed.
    fn bulk_import(&mut self, files: &[ImportFile], event: NodeId) -> Result<Vec<Option<NodeId>>>;

    /// File nodes whose fingerprint equals `fingerprint`, in the library's index order.
    fn find_files_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<NodeId>>;

    /// Add a file to a collection. Adding a file twice is a no-op.
    fn add_to_collection(&mut self, collection: NodeId, file: NodeId) -> Result<()>;

    /// Add a file to the library-wide hidden items set. Adding twice is a no-op.
    fn add_hidden(&mut self, file: NodeId) -> Result<()>;

    fn write_metadata(&mut self, file: NodeId, block: &MetadataBlock) -> Result<()>;
}
