use std::path::PathBuf;

use crate::library::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XMP rendering failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("not an Aperture library (missing {}): {}", .database.display(), .bundle.display())]
    NotApertureLibrary { bundle: PathBuf, database: PathBuf },

    #[error("catalog table {table} is unreadable: {reason}")]
    CatalogRead { table: &'static str, reason: String },

    #[error("referenced file {} lives on volume {volume} and is not supported", .path.display())]
    ReferencedFileUnsupported { path: PathBuf, volume: String },

    #[error("importing files into event \"{event}\" failed: {reason}")]
    ImportBatch { event: String, reason: String },

    #[error("failed to write metadata for {}: {reason}", .path.display())]
    MetadataWrite { path: PathBuf, reason: String },

    #[error("{kind} hierarchy starting at {uuid} is cyclic or deeper than {limit} levels")]
    HierarchyCycle {
        kind: HierarchyKind,
        uuid: String,
        limit: usize,
    },

    #[error("library node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("import aborted during {phase}: {source}")]
    Phase {
        phase: crate::Phase,
        #[source]
        source: Box<Error>,
    },
}

/// Which parent chain a [`Error::HierarchyCycle`] was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyKind {
    Folder,
    Keyword,
}

impl std::fmt::Display for HierarchyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HierarchyKind::Folder => write!(f, "folder"),
            HierarchyKind::Keyword => write!(f, "keyword"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
