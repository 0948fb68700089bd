use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, warn};

use super::files;
use super::schema;
use super::{ImportFile, Library, Node, NodeId, NodeKind, Scope};
use crate::error::{Error, Result};
use crate::hasher::{self, DEFAULT_CHECKSUM_WINDOW};
use crate::import::metadata::MetadataBlock;

/// File name of the node database inside a library directory.
pub const DATABASE_FILE: &str = "library.sqlite";

/// SQLite-backed destination library.
///
/// On disk a library is a directory holding `library.sqlite` and an `Events/`
/// tree with the copied masters. An in-memory store registers files in place.
pub struct LibraryStore {
    conn: Connection,
    files_root: Option<PathBuf>,
    copy_files: bool,
    checksum_window: usize,
}

/// Number of nodes per kind, plus the hidden set size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryCounts {
    pub events: usize,
    pub groups: usize,
    pub collections: usize,
    pub files: usize,
    pub hidden: usize,
}

impl LibraryStore {
    /// Open or create a library in `dir` with WAL mode.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join(DATABASE_FILE))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn,
            files_root: Some(dir.to_path_buf()),
            copy_files: true,
            checksum_window: DEFAULT_CHECKSUM_WINDOW,
        })
    }

    /// Open an in-memory library (for testing). Files are registered in place.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn,
            files_root: None,
            copy_files: false,
            checksum_window: DEFAULT_CHECKSUM_WINDOW,
        })
    }

    /// Register imported files at their original location instead of copying them.
    pub fn with_copy_files(mut self, copy_files: bool) -> Self {
        self.copy_files = copy_files;
        self
    }

    /// Window used when checking whether a file already in `Events/` is the one being imported.
    pub fn with_checksum_window(mut self, window: usize) -> Self {
        self.checksum_window = window;
        self
    }

    // ── Config ───────────────────────────────────────────────────────

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn counts(&self) -> Result<LibraryCounts> {
        let count_kind = |kind: NodeKind| -> Result<usize> {
            let n: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM nodes WHERE kind = ?1",
                params![kind.as_str()],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        };
        let hidden: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM hidden_items", [], |row| row.get(0))?;

        Ok(LibraryCounts {
            events: count_kind(NodeKind::Event)?,
            groups: count_kind(NodeKind::Group)?,
            collections: count_kind(NodeKind::Collection)?,
            files: count_kind(NodeKind::File)?,
            hidden: hidden as usize,
        })
    }

    pub fn node(&self, id: NodeId) -> Result<Node> {
        self.conn
            .query_row(
                "SELECT id, kind, caption FROM nodes WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok(Node {
                        id: NodeId(row.get(0)?),
                        kind: parse_kind(&row.get::<_, String>(1)?),
                        caption: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(Error::NodeNotFound(id))
    }

    pub fn events(&self) -> Result<Vec<Node>> {
        self.list_nodes(
            "SELECT id, kind, caption FROM nodes WHERE kind = 'Event' ORDER BY id",
            params![],
        )
    }

    /// Files of an event, in import order.
    pub fn event_files(&self, event: NodeId) -> Result<Vec<NodeId>> {
        self.list_ids(
            "SELECT node_id FROM files WHERE event_id = ?1 ORDER BY node_id",
            params![event.0],
        )
    }

    /// Files of a collection, in the order they were added.
    pub fn items_of(&self, collection: NodeId) -> Result<Vec<NodeId>> {
        self.list_ids(
            "SELECT file_id FROM items WHERE container_id = ?1 ORDER BY position",
            params![collection.0],
        )
    }

    pub fn hidden_files(&self) -> Result<Vec<NodeId>> {
        self.list_ids("SELECT file_id FROM hidden_items ORDER BY file_id", params![])
    }

    /// Where the library keeps the file behind a file node.
    pub fn file_path(&self, file: NodeId) -> Result<PathBuf> {
        self.conn
            .query_row(
                "SELECT path FROM files WHERE node_id = ?1",
                params![file.0],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(PathBuf::from)
            .ok_or(Error::NodeNotFound(file))
    }

    /// The XMP packet last written for a file, if any.
    pub fn metadata_for(&self, file: NodeId) -> Result<Option<String>> {
        let xmp = self
            .conn
            .query_row(
                "SELECT xmp FROM metadata WHERE file_id = ?1",
                params![file.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(xmp)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn list_nodes(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Node>> {
        let mut stmt = self.conn.prepare(sql)?;
        let nodes = stmt
            .query_map(params, |row| {
                Ok(Node {
                    id: NodeId(row.get(0)?),
                    kind: parse_kind(&row.get::<_, String>(1)?),
                    caption: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    fn list_ids(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<NodeId>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params, |row| Ok(NodeId(row.get(0)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Fail with [`Error::NodeNotFound`] unless `id` exists and is of `kind`.
    fn expect_kind(&self, id: NodeId, kind: NodeKind) -> Result<Node> {
        let node = self.node(id)?;
        if node.kind != kind {
            return Err(Error::NodeNotFound(id));
        }
        Ok(node)
    }

    fn create_container(&mut self, kind: NodeKind, caption: &str, scope: Scope) -> Result<NodeId> {
        let parent = match scope {
            Scope::Root => None,
            Scope::Group(group) => {
                self.expect_kind(group, NodeKind::Group)?;
                Some(group.0)
            }
        };
        self.conn.execute(
            "INSERT INTO nodes (kind, caption, parent_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![kind.as_str(), caption, parent, now()],
        )?;
        Ok(NodeId(self.conn.last_insert_rowid()))
    }

    fn owns(&self, path: &Path) -> bool {
        self.files_root
            .as_ref()
            .is_some_and(|root| path.starts_with(root))
    }
}

impl Library for LibraryStore {
    fn children(&self, scope: Scope) -> Result<Vec<Node>> {
        let parent = match scope {
            Scope::Root => None,
            Scope::Group(group) => Some(group.0),
        };
        self.list_nodes(
            "SELECT id, kind, caption FROM nodes
             WHERE parent_id IS ?1 AND kind IN ('Group', 'Collection')
             ORDER BY id",
            params![parent],
        )
    }

    fn create_group(&mut self, caption: &str, scope: Scope) -> Result<NodeId> {
        self.create_container(NodeKind::Group, caption, scope)
    }

    fn create_collection(&mut self, caption: &str, scope: Scope) -> Result<NodeId> {
        self.create_container(NodeKind::Collection, caption, scope)
    }

    fn create_event(&mut self, name: &str) -> Result<NodeId> {
        self.conn.execute(
            "INSERT INTO nodes (kind, caption, parent_id, created_at) VALUES ('Event', ?1, NULL, ?2)",
            params![name, now()],
        )?;
        Ok(NodeId(self.conn.last_insert_rowid()))
    }

    fn bulk_import(&mut self, batch: &[ImportFile], event: NodeId) -> Result<Vec<Option<NodeId>>> {
        let event_node = self.expect_kind(event, NodeKind::Event)?;
        let target_dir = match (&self.files_root, self.copy_files) {
            (Some(root), true) => Some(files::event_dir(root, &event_node.caption)),
            _ => None,
        };
        let window = self.checksum_window;

        let tx = self.conn.transaction()?;
        let mut nodes = Vec::with_capacity(batch.len());

        for file in batch {
            let size = match file.path.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "cannot read file, skipping");
                    nodes.push(None);
                    continue;
                }
            };

            let stored = match &target_dir {
                Some(dir) => {
                    // Compared on content, not `file.fingerprint`, which may come from another hasher
                    let is_same = |existing: &Path| {
                        existing.metadata().is_ok_and(|m| m.len() == size)
                            && match (
                                hasher::weak_checksum(existing, window),
                                hasher::weak_checksum(&file.path, window),
                            ) {
                                (Ok(a), Ok(b)) => a == b,
                                _ => false,
                            }
                    };
                    let is_partner = |existing: &Path| {
                        file.pair_key.is_some() && stored_pair_key(&tx, existing) == file.pair_key
                    };
                    let target = files::build_target_path(dir, &file.path, is_same, is_partner);
                    match files::copy_into_library(&file.path, &target) {
                        Ok(_) => target,
                        Err(e) => {
                            warn!(path = %file.path.display(), error = %e, "copy failed, skipping");
                            nodes.push(None);
                            continue;
                        }
                    }
                }
                None => file.path.clone(),
            };

            let caption = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            tx.execute(
                "INSERT INTO nodes (kind, caption, parent_id, created_at) VALUES ('File', ?1, ?2, ?3)",
                params![caption, event.0, now()],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO files (node_id, event_id, path, source_path, fingerprint, size, pair_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    event.0,
                    stored.to_string_lossy().as_ref(),
                    file.path.to_string_lossy().as_ref(),
                    file.fingerprint,
                    size as i64,
                    file.pair_key,
                ],
            )?;
            debug!(node = id, path = %stored.display(), "file imported");
            nodes.push(Some(NodeId(id)));
        }

        tx.commit()?;
        Ok(nodes)
    }

    fn find_files_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<NodeId>> {
        self.list_ids(
            "SELECT node_id FROM files WHERE fingerprint = ?1 ORDER BY node_id",
            params![fingerprint],
        )
    }

    fn add_to_collection(&mut self, collection: NodeId, file: NodeId) -> Result<()> {
        self.expect_kind(collection, NodeKind::Collection)?;
        self.expect_kind(file, NodeKind::File)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO items (container_id, file_id, position)
             VALUES (?1, ?2, (SELECT COUNT(*) FROM items WHERE container_id = ?1))",
            params![collection.0, file.0],
        )?;
        Ok(())
    }

    fn add_hidden(&mut self, file: NodeId) -> Result<()> {
        self.expect_kind(file, NodeKind::File)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO hidden_items (file_id) VALUES (?1)",
            params![file.0],
        )?;
        Ok(())
    }

    fn write_metadata(&mut self, file: NodeId, block: &MetadataBlock) -> Result<()> {
        let path = self.file_path(file)?;
        let xmp = block.to_xmp()?;

        // Sidecars only go next to files the library owns, never into the source bundle
        let sidecar = if self.owns(&path) {
            let sidecar = files::sidecar_path(&path);
            fs::write(&sidecar, &xmp).map_err(|e| Error::MetadataWrite {
                path: sidecar.clone(),
                reason: e.to_string(),
            })?;
            Some(sidecar)
        } else {
            None
        };

        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (file_id, xmp, sidecar_path, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                file.0,
                xmp,
                sidecar.map(|p| p.to_string_lossy().to_string()),
                now()
            ],
        )?;
        Ok(())
    }
}

/// Pair key recorded for the file stored at `path`, if any.
fn stored_pair_key(conn: &Connection, path: &Path) -> Option<String> {
    conn.query_row(
        "SELECT pair_key FROM files WHERE path = ?1 ORDER BY node_id LIMIT 1",
        params![path.to_string_lossy().as_ref()],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .ok()
    .flatten()
    .flatten()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn parse_kind(s: &str) -> NodeKind {
    match s {
        "Event" => NodeKind::Event,
        "Group" => NodeKind::Group,
        "Collection" => NodeKind::Collection,
        _ => NodeKind::File,
    }
}
