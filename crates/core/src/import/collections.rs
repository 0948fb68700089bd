use tracing::{debug, warn};

use super::hierarchy::resolve_or_create_collection;
use super::{FileNodes, ImportReport};
use crate::domain::{Album, SourceCatalog};
use crate::error::{Error, Result};
use crate::library::{Library, NodeId};
use crate::ImportProgress;

/// Map every user album to a collection and attach the imported files of its versions.
///
/// Implicit project albums are ignored. Albums whose folder is unknown or whose
/// folder chain is cyclic are skipped and counted.
pub fn build_collections<L: Library + ?Sized>(
    library: &mut L,
    catalog: &SourceCatalog,
    filenodes: &FileNodes,
    max_depth: usize,
    report: &mut ImportReport,
    emit: &mut dyn FnMut(ImportProgress),
) -> Result<()> {
    for album in catalog.albums.values() {
        if catalog.is_implicit_album(album) {
            continue;
        }
        if !catalog.folders.contains_key(&album.folder_uuid) {
            warn!(album = %album.name, folder = %album.folder_uuid, "album folder not in catalog, skipping");
            report.albums_skipped += 1;
            continue;
        }

        let resolved = match resolve_or_create_collection(library, album, &catalog.folders, max_depth, report) {
            Ok(resolved) => resolved,
            Err(e @ Error::HierarchyCycle { .. }) => {
                warn!(album = %album.name, "{e}, skipping album");
                report.albums_skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        emit(ImportProgress::CollectionResolved {
            name: album.name.clone(),
            created: resolved.created,
        });

        populate_collection(library, album, resolved.id, catalog, filenodes, report)?;
    }
    Ok(())
}

/// Attach every mapped master of the album's versions to `collection`.
pub fn populate_collection<L: Library + ?Sized>(
    library: &mut L,
    album: &Album,
    collection: NodeId,
    catalog: &SourceCatalog,
    filenodes: &FileNodes,
    report: &mut ImportReport,
) -> Result<usize> {
    let mut added = 0;
    for version_uuid in &album.versions {
        let Some(version) = catalog.versions.get(version_uuid) else {
            continue;
        };
        for master_uuid in version.master_uuids() {
            // Unmapped masters were never imported (referenced or failed)
            let Some(node) = filenodes.get(master_uuid) else {
                continue;
            };
            library.add_to_collection(collection, node)?;
            added += 1;
        }
    }
    debug!(album = %album.name, %collection, files = added, "collection populated");
    report.memberships += added;
    Ok(added)
}
