use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

/// Tables of `Library.apdb` that the reader depends on.
pub const REQUIRED_TABLES: [&str; 7] = [
    "RKFolder",
    "RKAlbum",
    "RKKeyword",
    "RKVersion",
    "RKMaster",
    "RKAlbumVersion",
    "RKKeywordForVersion",
];

/// Fail with [`Error::CatalogRead`] if any required table is absent.
pub fn verify(conn: &Connection) -> Result<()> {
    for table in REQUIRED_TABLES {
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(Error::CatalogRead {
                table,
                reason: "table is missing".to_string(),
            });
        }
    }
    Ok(())
}

/// Create the subset of the Aperture schema read by the importer.
/// Columns the importer never touches are left out; used to build fixture libraries.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS RKFolder (
            modelId           INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid              TEXT,
            name              TEXT,
            folderType        INTEGER,
            parentFolderUuid  TEXT,
            implicitAlbumUuid TEXT,
            isInTrash         INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS RKAlbum (
            modelId    INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid       TEXT,
            name       TEXT,
            albumType  INTEGER,
            folderUuid TEXT,
            isMagic    INTEGER NOT NULL DEFAULT 0,
            isInTrash  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS RKKeyword (
            modelId  INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid     TEXT,
            name     TEXT,
            parentId INTEGER
        );

        CREATE TABLE IF NOT EXISTS RKVersion (
            modelId          INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid             TEXT,
            fileName         TEXT,
            masterUuid       TEXT,
            rawMasterUuid    TEXT,
            nonRawMasterUuid TEXT,
            projectUuid      TEXT,
            mainRating       INTEGER NOT NULL DEFAULT 0,
            isHidden         INTEGER NOT NULL DEFAULT 0,
            isFlagged        INTEGER NOT NULL DEFAULT 0,
            exifLatitude     REAL,
            exifLongitude    REAL,
            isInTrash        INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS RKMaster (
            modelId             INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid                TEXT,
            fileName            TEXT,
            projectUuid         TEXT,
            fileVolumeUuid      TEXT,
            originalVersionUuid TEXT,
            imagePath           TEXT,
            isInTrash           INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS RKAlbumVersion (
            modelId   INTEGER PRIMARY KEY AUTOINCREMENT,
            versionId INTEGER NOT NULL,
            albumId   INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS RKKeywordForVersion (
            modelId   INTEGER PRIMARY KEY AUTOINCREMENT,
            versionId INTEGER NOT NULL,
            keywordId INTEGER NOT NULL
        );
        ",
    )?;
    Ok(())
}
