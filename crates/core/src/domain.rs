use std::collections::BTreeMap;

use serde::Serialize;

/// `folderType` value of a project folder. Projects become events.
pub const PROJECT_FOLDER_TYPE: i64 = 2;

/// Parent UUIDs that mark a folder as sitting at the top of the library.
pub const ROOT_FOLDER_MARKERS: [&str; 2] = ["TopLevelAlbums", "LibraryFolder"];

/// A row of `RKFolder`: either a project or a plain folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Folder {
    pub uuid: String,
    pub name: String,
    pub folder_type: i64,
    pub parent_folder_uuid: Option<String>,
    pub implicit_album_uuid: Option<String>,
}

impl Folder {
    pub fn is_project(&self) -> bool {
        self.folder_type == PROJECT_FOLDER_TYPE
    }

    /// True when the folder is a library root marker or hangs directly off one.
    pub fn is_top_level(&self) -> bool {
        ROOT_FOLDER_MARKERS.contains(&self.uuid.as_str())
            || self
                .parent_folder_uuid
                .as_deref()
                .is_some_and(|p| ROOT_FOLDER_MARKERS.contains(&p))
    }
}

/// A row of `RKAlbum` with its member versions resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub uuid: String,
    pub model_id: i64,
    pub name: String,
    pub album_type: i64,
    pub folder_uuid: String,
    pub versions: Vec<String>,
}

/// A row of `RKKeyword`. `parent_uuid` is resolved from the integer `parentId`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyword {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub parent_uuid: Option<String>,
}

/// An edited photo. References up to two masters (RAW and a non-RAW derivative);
/// `master_uuid` names the one that is currently visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Version {
    pub uuid: String,
    pub model_id: i64,
    pub file_name: Option<String>,
    pub master_uuid: String,
    pub raw_master_uuid: Option<String>,
    pub non_raw_master_uuid: Option<String>,
    pub project_uuid: String,
    pub main_rating: i64,
    pub is_hidden: bool,
    pub is_flagged: bool,
    pub exif_latitude: Option<f64>,
    pub exif_longitude: Option<f64>,
    pub keyword_uuids: Vec<String>,
}

impl Version {
    /// Every distinct master UUID this version points at, primary first.
    pub fn master_uuids(&self) -> Vec<&str> {
        let mut uuids = vec![self.master_uuid.as_str()];
        for uuid in [&self.raw_master_uuid, &self.non_raw_master_uuid]
            .into_iter()
            .flatten()
        {
            if !uuids.contains(&uuid.as_str()) {
                uuids.push(uuid);
            }
        }
        uuids
    }
}

/// A physical file tracked by the source library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Master {
    pub uuid: String,
    pub file_name: String,
    pub project_uuid: Option<String>,
    pub file_volume_uuid: Option<String>,
    pub original_version_uuid: Option<String>,
    pub image_path: String,
}

impl Master {
    /// Referenced masters live on an external volume rather than inside the bundle.
    pub fn is_referenced(&self) -> bool {
        self.file_volume_uuid.is_some()
    }
}

/// The fully materialized source catalog, every relation keyed by UUID.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceCatalog {
    pub folders: BTreeMap<String, Folder>,
    pub albums: BTreeMap<String, Album>,
    pub keywords: BTreeMap<String, Keyword>,
    pub versions: BTreeMap<String, Version>,
    pub masters: BTreeMap<String, Master>,
}

impl SourceCatalog {
    /// Project folders, in UUID order.
    pub fn projects(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values().filter(|f| f.is_project())
    }

    /// Versions belonging to the given project, in UUID order.
    pub fn project_versions<'a>(&'a self, project_uuid: &'a str) -> impl Iterator<Item = &'a Version> {
        self.versions
            .values()
            .filter(move |v| v.project_uuid == project_uuid)
    }

    /// True when `album` is the auto-generated "all photos" album of its folder.
    pub fn is_implicit_album(&self, album: &Album) -> bool {
        self.folders
            .get(&album.folder_uuid)
            .is_some_and(|f| f.implicit_album_uuid.as_deref() == Some(album.uuid.as_str()))
    }
}

/// Relation sizes, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub folders: usize,
    pub projects: usize,
    pub albums: usize,
    pub keywords: usize,
    pub versions: usize,
    pub masters: usize,
    pub referenced_masters: usize,
}

impl From<&SourceCatalog> for CatalogStats {
    fn from(catalog: &SourceCatalog) -> Self {
        Self {
            folders: catalog.folders.len(),
            projects: catalog.projects().count(),
            albums: catalog.albums.len(),
            keywords: catalog.keywords.len(),
            versions: catalog.versions.len(),
            masters: catalog.masters.len(),
            referenced_masters: catalog.masters.values().filter(|m| m.is_referenced()).count(),
        }
    }
}
