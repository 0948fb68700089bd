use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: &str = "1";

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS nodes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            kind        TEXT NOT NULL,
            caption     TEXT NOT NULL,
            parent_id   INTEGER REFERENCES nodes(id),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);
        CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);

        CREATE TABLE IF NOT EXISTS files (
            node_id     INTEGER PRIMARY KEY REFERENCES nodes(id),
            event_id    INTEGER NOT NULL REFERENCES nodes(id),
            path        TEXT NOT NULL,
            source_path TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            size        INTEGER NOT NULL,
            pair_key    TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_files_fingerprint ON files(fingerprint);
        CREATE INDEX IF NOT EXISTS idx_files_path ON files(path);

        CREATE TABLE IF NOT EXISTS items (
            container_id INTEGER NOT NULL REFERENCES nodes(id),
            file_id      INTEGER NOT NULL REFERENCES nodes(id),
            position     INTEGER NOT NULL,
            PRIMARY KEY (container_id, file_id)
        );

        CREATE TABLE IF NOT EXISTS hidden_items (
            file_id     INTEGER PRIMARY KEY REFERENCES nodes(id)
        );

        CREATE TABLE IF NOT EXISTS metadata (
            file_id      INTEGER PRIMARY KEY REFERENCES nodes(id),
            xmp          TEXT NOT NULL,
            sidecar_path TEXT,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO config (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO config (key, value) VALUES ('created_at', datetime('now'))",
        [],
    )?;
    Ok(())
}
