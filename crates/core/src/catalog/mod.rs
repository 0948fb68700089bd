pub mod schema;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, Row};
use tracing::{debug, warn};

use crate::domain::*;
use crate::error::{Error, Result};

/// Read-only view over an Aperture `Library.apdb` database.
pub struct ApertureCatalog {
    conn: Connection,
}

impl ApertureCatalog {
    /// Open the database read-only and check that every table the reader needs exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::from_connection(conn)
    }

    /// Wrap an already open connection (fixtures, in-memory databases).
    pub fn from_connection(conn: Connection) -> Result<Self> {
        schema::verify(&conn)?;
        Ok(Self { conn })
    }

    /// Materialize every relation. Any malformed row aborts the whole read.
    pub fn load(&self) -> Result<SourceCatalog> {
        let catalog = SourceCatalog {
            folders: self.folders()?,
            albums: self.albums()?,
            keywords: self.keywords()?,
            versions: self.versions()?,
            masters: self.masters()?,
        };
        debug!(
            folders = catalog.folders.len(),
            albums = catalog.albums.len(),
            keywords = catalog.keywords.len(),
            versions = catalog.versions.len(),
            masters = catalog.masters.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    // ── Relations ────────────────────────────────────────────────────

    pub fn folders(&self) -> Result<BTreeMap<String, Folder>> {
        let rows = self.query_rows(
            "RKFolder",
            "SELECT uuid, name, folderType, parentFolderUuid, implicitAlbumUuid
             FROM RKFolder WHERE isInTrash = 0 ORDER BY modelId",
            |row| {
                Ok(Folder {
                    uuid: row.get(0)?,
                    name: row.get(1)?,
                    folder_type: row.get(2)?,
                    parent_folder_uuid: row.get(3)?,
                    implicit_album_uuid: row.get(4)?,
                })
            },
        )?;
        Ok(rows.into_iter().map(|f| (f.uuid.clone(), f)).collect())
    }

    /// Non-magic, non-trashed albums with their member version UUIDs.
    pub fn albums(&self) -> Result<BTreeMap<String, Album>> {
        let rows = self.query_rows(
            "RKAlbum",
            "SELECT uuid, modelId, name, albumType, folderUuid
             FROM RKAlbum WHERE isInTrash = 0 AND isMagic = 0 ORDER BY modelId",
            |row| {
                Ok(Album {
                    uuid: row.get(0)?,
                    model_id: row.get(1)?,
                    name: row.get(2)?,
                    album_type: row.get(3)?,
                    folder_uuid: row.get(4)?,
                    versions: Vec::new(),
                })
            },
        )?;

        let mut albums = BTreeMap::new();
        for mut album in rows {
            album.versions = self.album_version_uuids(album.model_id)?;
            albums.insert(album.uuid.clone(), album);
        }
        Ok(albums)
    }

    /// Keywords with `parentId` resolved to the parent's UUID.
    pub fn keywords(&self) -> Result<BTreeMap<String, Keyword>> {
        let rows: Vec<(Keyword, Option<i64>)> = self.query_rows(
            "RKKeyword",
            "SELECT modelId, uuid, name, parentId FROM RKKeyword ORDER BY modelId",
            |row| {
                Ok((
                    Keyword {
                        id: row.get(0)?,
                        uuid: row.get(1)?,
                        name: row.get(2)?,
                        parent_uuid: None,
                    },
                    row.get(3)?,
                ))
            },
        )?;

        let uuid_by_id: HashMap<i64, String> =
            rows.iter().map(|(k, _)| (k.id, k.uuid.clone())).collect();

        let mut keywords = BTreeMap::new();
        for (mut keyword, parent_id) in rows {
            // parentId 0 is used for root keywords in some libraries
            if let Some(parent_id) = parent_id.filter(|id| *id != 0) {
                keyword.parent_uuid = uuid_by_id.get(&parent_id).cloned();
                if keyword.parent_uuid.is_none() {
                    warn!(keyword = %keyword.name, parent_id, "keyword parent not found, treating as root");
                }
            }
            keywords.insert(keyword.uuid.clone(), keyword);
        }
        Ok(keywords)
    }

    /// Non-trashed versions with their keyword UUIDs.
    pub fn versions(&self) -> Result<BTreeMap<String, Version>> {
        let rows = self.query_rows(
            "RKVersion",
            "SELECT modelId, uuid, fileName, masterUuid, rawMasterUuid, nonRawMasterUuid,
                    projectUuid, mainRating, isHidden, isFlagged, exifLatitude, exifLongitude
             FROM RKVersion WHERE isInTrash = 0 ORDER BY modelId",
            |row| {
                Ok(Version {
                    model_id: row.get(0)?,
                    uuid: row.get(1)?,
                    file_name: row.get(2)?,
                    master_uuid: row.get(3)?,
                    raw_master_uuid: row.get(4)?,
                    non_raw_master_uuid: row.get(5)?,
                    project_uuid: row.get(6)?,
                    main_rating: row.get(7)?,
                    is_hidden: row.get(8)?,
                    is_flagged: row.get(9)?,
                    exif_latitude: row.get(10)?,
                    exif_longitude: row.get(11)?,
                    keyword_uuids: Vec::new(),
                })
            },
        )?;

        let mut versions = BTreeMap::new();
        for mut version in rows {
            version.keyword_uuids = self.version_keyword_uuids(version.model_id)?;
            versions.insert(version.uuid.clone(), version);
        }
        Ok(versions)
    }

    pub fn masters(&self) -> Result<BTreeMap<String, Master>> {
        let rows = self.query_rows(
            "RKMaster",
            "SELECT uuid, fileName, projectUuid, fileVolumeUuid, originalVersionUuid, imagePath
             FROM RKMaster WHERE isInTrash = 0 ORDER BY modelId",
            |row| {
                Ok(Master {
                    uuid: row.get(0)?,
                    file_name: row.get(1)?,
                    project_uuid: row.get(2)?,
                    file_volume_uuid: row.get(3)?,
                    original_version_uuid: row.get(4)?,
                    image_path: row.get(5)?,
                })
            },
        )?;
        Ok(rows.into_iter().map(|m| (m.uuid.clone(), m)).collect())
    }

    // ── Join projections ─────────────────────────────────────────────

    /// Version UUIDs of an album, keyed by the album's integer `modelId`.
    pub fn album_version_uuids(&self, album_id: i64) -> Result<Vec<String>> {
        self.query_uuids(
            "RKAlbumVersion",
            "SELECT RKVersion.uuid FROM RKVersion
             INNER JOIN RKAlbumVersion ON RKAlbumVersion.versionId = RKVersion.modelId
             WHERE RKAlbumVersion.albumId = ?1
             ORDER BY RKAlbumVersion.modelId",
            album_id,
        )
    }

    /// Keyword UUIDs of a version, keyed by the version's integer `modelId`.
    pub fn version_keyword_uuids(&self, version_id: i64) -> Result<Vec<String>> {
        self.query_uuids(
            "RKKeywordForVersion",
            "SELECT RKKeyword.uuid FROM RKKeyword
             INNER JOIN RKKeywordForVersion ON RKKeywordForVersion.keywordId = RKKeyword.modelId
             WHERE RKKeywordForVersion.versionId = ?1
             ORDER BY RKKeywordForVersion.modelId",
            version_id,
        )
    }

    fn query_uuids(&self, table: &'static str, sql: &str, id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(|e| malformed(table, e))?;
        let uuids = stmt
            .query_map(params![id], |row| row.get(0))
            .map_err(|e| malformed(table, e))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| malformed(table, e))?;
        Ok(uuids)
    }

    fn query_rows<T, F>(&self, table: &'static str, sql: &str, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql).map_err(|e| malformed(table, e))?;
        let rows = stmt
            .query_map([], map)
            .map_err(|e| malformed(table, e))?
            .collect::<rusqlite::Result<Vec<T>>>()
            .map_err(|e| malformed(table, e))?;
        Ok(rows)
    }
}

fn malformed(table: &'static str, err: rusqlite::Error) -> Error {
    Error::CatalogRead {
        table,
        reason: err.to_string(),
    }
}
