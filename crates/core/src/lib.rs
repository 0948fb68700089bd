pub mod bundle;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod hasher;
pub mod import;
pub mod library;

use std::path::PathBuf;

use tracing::info;

pub use bundle::ApertureBundle;
pub use config::ImportConfig;
pub use domain::{CatalogStats, SourceCatalog};
pub use error::{Error, Result};
pub use import::dedup::Deduplicator;
pub use import::{FileNodes, ImportReport};
pub use library::{Library, LibraryStore};

/// Stages of an import run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ReadCatalog,
    Projects,
    Collections,
    Metadata,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::ReadCatalog => write!(f, "catalog read"),
            Phase::Projects => write!(f, "project import"),
            Phase::Collections => write!(f, "collection build"),
            Phase::Metadata => write!(f, "metadata write"),
        }
    }
}

/// Callback for reporting import progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportProgress {
    /// A phase is starting with `total` items to process.
    PhaseStart { phase: Phase, total: usize },
    /// A project produced a new event.
    EventCreated { name: String, files: usize },
    /// A project had nothing new to import.
    EventSkipped { name: String },
    FileImported { path: PathBuf },
    /// A master was already in the library.
    FileMatched { path: PathBuf },
    FileFailed { path: PathBuf },
    CollectionResolved { name: String, created: bool },
    MetadataWritten { version_uuid: String },
    PhaseComplete { phase: Phase },
}

/// Imports one Aperture bundle into a destination library.
pub struct Importer {
    bundle: ApertureBundle,
    config: ImportConfig,
    dedup: Deduplicator,
}

impl Importer {
    pub fn new(bundle: ApertureBundle, config: ImportConfig) -> Self {
        let dedup = Deduplicator::weak(config.checksum_window);
        Self {
            bundle,
            config,
            dedup,
        }
    }

    /// Replace the fingerprint strategy used to detect files already in the library.
    pub fn with_deduplicator(mut self, dedup: Deduplicator) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn bundle(&self) -> &ApertureBundle {
        &self.bundle
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Read and materialize the bundle's catalog.
    pub fn load_catalog(&self) -> Result<SourceCatalog> {
        self.bundle
            .catalog()
            .and_then(|catalog| catalog.load())
            .map_err(in_phase(Phase::ReadCatalog))
    }

    /// Run every phase against `library`.
    ///
    /// The catalog is read completely before the library is touched. The first
    /// structural failure aborts the run; work done by earlier phases is kept.
    pub fn run<L: Library + ?Sized>(
        &self,
        library: &mut L,
        progress: Option<&mut dyn FnMut(ImportProgress)>,
    ) -> Result<ImportReport> {
        let catalog = self.load_catalog()?;
        info!(
            bundle = %self.bundle.root().display(),
            folders = catalog.folders.len(),
            albums = catalog.albums.len(),
            versions = catalog.versions.len(),
            masters = catalog.masters.len(),
            "catalog loaded"
        );
        self.run_catalog(&catalog, library, progress)
    }

    /// Run the import phases on an already loaded catalog.
    pub fn run_catalog<L: Library + ?Sized>(
        &self,
        catalog: &SourceCatalog,
        library: &mut L,
        progress: Option<&mut dyn FnMut(ImportProgress)>,
    ) -> Result<ImportReport> {
        let mut noop = |_: ImportProgress| {};
        let emit: &mut dyn FnMut(ImportProgress) = match progress {
            Some(cb) => cb,
            None => &mut noop,
        };

        let max_depth = self.config.max_hierarchy_depth;
        let mut report = ImportReport::default();
        let mut filenodes = FileNodes::new();

        // Projects
        let projects: Vec<_> = catalog.projects().collect();
        emit(ImportProgress::PhaseStart {
            phase: Phase::Projects,
            total: projects.len(),
        });
        for project in projects {
            import::project::import_project(
                library,
                project,
                catalog,
                &self.bundle,
                &self.dedup,
                &mut filenodes,
                &mut report,
                emit,
            )
            .map_err(in_phase(Phase::Projects))?;
        }
        emit(ImportProgress::PhaseComplete {
            phase: Phase::Projects,
        });
        info!(
            events = report.events_created,
            imported = report.files_imported,
            matched = report.files_matched,
            "projects imported"
        );

        // Collections
        emit(ImportProgress::PhaseStart {
            phase: Phase::Collections,
            total: catalog.albums.len(),
        });
        import::collections::build_collections(library, catalog, &filenodes, max_depth, &mut report, emit)
            .map_err(in_phase(Phase::Collections))?;
        emit(ImportProgress::PhaseComplete {
            phase: Phase::Collections,
        });
        info!(
            created = report.collections_created,
            reused = report.collections_reused,
            memberships = report.memberships,
            "collections built"
        );

        // Metadata
        let tagged = catalog
            .versions
            .values()
            .filter(|v| !v.keyword_uuids.is_empty())
            .count();
        emit(ImportProgress::PhaseStart {
            phase: Phase::Metadata,
            total: tagged,
        });
        import::metadata::apply_metadata(library, catalog, &filenodes, max_depth, &mut report, emit)
            .map_err(in_phase(Phase::Metadata))?;
        emit(ImportProgress::PhaseComplete {
            phase: Phase::Metadata,
        });
        info!(
            written = report.metadata_written,
            failed = report.metadata_failed,
            "metadata applied"
        );

        Ok(report)
    }
}

fn in_phase(phase: Phase) -> impl FnOnce(Error) -> Error {
    move |source| match source {
        e @ Error::Phase { .. } => e,
        e => Error::Phase {
            phase,
            source: Box::new(e),
        },
    }
}
