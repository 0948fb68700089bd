use std::path::{Component, Path, PathBuf};

use crate::catalog::ApertureCatalog;
use crate::domain::Master;
use crate::error::{Error, Result};

/// An `.aplibrary` bundle on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApertureBundle {
    root: PathBuf,
}

impl ApertureBundle {
    /// Location of the main database inside a bundle.
    pub const DATABASE: &'static str = "Database/apdb/Library.apdb";

    /// Validate that `path` looks like an Aperture library bundle.
    pub fn open(path: &Path) -> Result<Self> {
        let database = path.join(Self::DATABASE);
        if !database.is_file() {
            return Err(Error::NotApertureLibrary {
                bundle: path.to_path_buf(),
                database,
            });
        }
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(Self::DATABASE)
    }

    pub fn catalog(&self) -> Result<ApertureCatalog> {
        ApertureCatalog::open(&self.database_path())
    }

    /// Path of a managed master inside the bundle's `Masters/` tree.
    /// Referenced masters live on other volumes and are rejected, as are image
    /// paths that would resolve outside `Masters/`.
    pub fn master_path(&self, master: &Master) -> Result<PathBuf> {
        if let Some(volume) = &master.file_volume_uuid {
            return Err(Error::ReferencedFileUnsupported {
                path: PathBuf::from(&master.image_path),
                volume: volume.clone(),
            });
        }

        let relative = Path::new(&master.image_path);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained || relative.file_name().is_none() {
            return Err(Error::CatalogRead {
                table: "RKMaster",
                reason: format!(
                    "master {} has image path {:?} outside Masters/",
                    master.uuid, master.image_path
                ),
            });
        }
        let mut path = self.root.join("Masters");
        path.extend(relative.components().filter(|c| matches!(c, Component::Normal(_))));
        Ok(path)
    }
}
