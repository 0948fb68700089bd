use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::dedup::Deduplicator;
use super::{FileNodes, ImportReport};
use crate::bundle::ApertureBundle;
use crate::domain::{Folder, SourceCatalog, Version};
use crate::error::{Error, Result};
use crate::library::{ImportFile, Library, NodeId};
use crate::ImportProgress;

/// One master file of a project, as seen from one of its versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub master_uuid: String,
    pub version_uuid: String,
    pub path: PathBuf,
    /// Not the version's visible master (e.g. the RAW half of a RAW+JPEG pair shown as JPEG).
    pub hidden: bool,
    /// Set to the version UUID for both halves of a RAW+JPEG pair.
    pub pair_key: Option<String>,
}

/// Every importable master referenced by the versions of `project`.
///
/// Each version contributes its RAW and non-RAW masters; a version with neither
/// contributes its primary master. Referenced and unknown masters are skipped,
/// and so are masters whose image path points outside the bundle.
pub fn collect_candidates(
    project: &Folder,
    catalog: &SourceCatalog,
    bundle: &ApertureBundle,
    report: &mut ImportReport,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for version in catalog.project_versions(&project.uuid) {
        let masters = version_masters(version);
        let pair_key = (masters.len() == 2 && masters[0] != masters[1]).then(|| version.uuid.clone());
        for master_uuid in masters {
            let Some(master) = catalog.masters.get(master_uuid) else {
                warn!(version = %version.uuid, master = master_uuid, "master not found in catalog, skipping");
                report.missing_masters += 1;
                continue;
            };

            match bundle.master_path(master) {
                Ok(path) => candidates.push(Candidate {
                    master_uuid: master_uuid.to_string(),
                    version_uuid: version.uuid.clone(),
                    path,
                    hidden: master_uuid != version.master_uuid,
                    pair_key: pair_key.clone(),
                }),
                Err(e @ Error::ReferencedFileUnsupported { .. }) => {
                    warn!(master = master_uuid, "{e}, skipping");
                    report.referenced_skipped += 1;
                }
                Err(e) => {
                    warn!(master = master_uuid, "{e}, skipping");
                    report.files_failed += 1;
                }
            }
        }
    }

    candidates
}

fn version_masters(version: &Version) -> Vec<&str> {
    let pair: Vec<&str> = [&version.raw_master_uuid, &version.non_raw_master_uuid]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    if pair.is_empty() {
        vec![version.master_uuid.as_str()]
    } else {
        pair
    }
}

/// Convert a project into an event.
///
/// Masters already in the library (by fingerprint) are mapped without importing.
/// If nothing is left to import no event is created. Non-visible masters end up in
/// the library's hidden items. Returns the created event, if any.
#[allow(clippy::too_many_arguments)]
pub fn import_project<L: Library + ?Sized>(
    library: &mut L,
    project: &Folder,
    catalog: &SourceCatalog,
    bundle: &ApertureBundle,
    dedup: &Deduplicator,
    filenodes: &mut FileNodes,
    report: &mut ImportReport,
    emit: &mut dyn FnMut(ImportProgress),
) -> Result<Option<NodeId>> {
    let candidates = collect_candidates(project, catalog, bundle, report);

    // One entry per master not yet mapped by an earlier project or version
    let mut seen = HashSet::new();
    let pending: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !filenodes.contains(&c.master_uuid) && seen.insert(c.master_uuid.as_str()))
        .collect();

    let paths: Vec<PathBuf> = pending.iter().map(|c| c.path.clone()).collect();
    let fingerprints = dedup.fingerprint_all(&paths);

    let mut to_import: Vec<ImportFile> = Vec::new();
    let mut to_import_uuids: Vec<&str> = Vec::new();

    for (candidate, fingerprint) in pending.iter().zip(fingerprints) {
        let fingerprint = match fingerprint {
            Ok(fp) => fp,
            Err(e) => {
                warn!(path = %candidate.path.display(), error = %e, "cannot read master, skipping");
                report.files_failed += 1;
                emit(ImportProgress::FileFailed {
                    path: candidate.path.clone(),
                });
                continue;
            }
        };

        match dedup.find_existing(&*library, &fingerprint)? {
            Some(node) => {
                debug!(path = %candidate.path.display(), %node, "already in library");
                filenodes.insert(&candidate.master_uuid, node);
                report.files_matched += 1;
                emit(ImportProgress::FileMatched {
                    path: candidate.path.clone(),
                });
            }
            None => {
                to_import.push(ImportFile {
                    path: candidate.path.clone(),
                    fingerprint,
                    pair_key: candidate.pair_key.clone(),
                });
                to_import_uuids.push(&candidate.master_uuid);
            }
        }
    }

    let event = if to_import.is_empty() {
        debug!(project = %project.name, "nothing new to import, no event created");
        report.events_skipped += 1;
        emit(ImportProgress::EventSkipped {
            name: project.name.clone(),
        });
        None
    } else {
        info!(project = %project.name, files = to_import.len(), "creating event");
        let event = library.create_event(&project.name)?;
        report.events_created += 1;
        emit(ImportProgress::EventCreated {
            name: project.name.clone(),
            files: to_import.len(),
        });

        let nodes = library
            .bulk_import(&to_import, event)
            .map_err(|e| Error::ImportBatch {
                event: project.name.clone(),
                reason: e.to_string(),
            })?;

        for ((file, uuid), node) in to_import.iter().zip(&to_import_uuids).zip(nodes) {
            match node {
                Some(node) => {
                    filenodes.insert(uuid, node);
                    report.files_imported += 1;
                    emit(ImportProgress::FileImported {
                        path: file.path.clone(),
                    });
                }
                None => {
                    warn!(path = %file.path.display(), "library failed to import file");
                    report.files_failed += 1;
                    emit(ImportProgress::FileFailed {
                        path: file.path.clone(),
                    });
                }
            }
        }
        Some(event)
    };

    let mut hidden = HashSet::new();
    for candidate in candidates.iter().filter(|c| c.hidden) {
        if let Some(node) = filenodes.get(&candidate.master_uuid) {
            library.add_hidden(node)?;
            if hidden.insert(node) {
                report.hidden += 1;
            }
        }
    }

    Ok(event)
}
