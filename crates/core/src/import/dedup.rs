use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::hasher;
use crate::library::{Library, NodeId};

type FingerprintFn = dyn Fn(&Path) -> io::Result<String> + Send + Sync;

/// Detects masters that are already part of the destination library.
///
/// The fingerprint function is pluggable; the default is the weak checksum.
/// Weak checksums can collide, and a collision makes two different files look
/// like the same one. When several library files match, the first one in the
/// library's index order wins.
pub struct Deduplicator {
    fingerprint: Box<FingerprintFn>,
}

impl Deduplicator {
    /// Deduplicate with [`hasher::weak_checksum`] over `window` bytes at each end.
    pub fn weak(window: usize) -> Self {
        Self::with_fingerprint(move |path| hasher::weak_checksum(path, window))
    }

    pub fn with_fingerprint(
        fingerprint: impl Fn(&Path) -> io::Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            fingerprint: Box::new(fingerprint),
        }
    }

    pub fn fingerprint(&self, path: &Path) -> io::Result<String> {
        (self.fingerprint)(path)
    }

    /// Fingerprint many files in parallel. Results are in input order.
    pub fn fingerprint_all(&self, paths: &[PathBuf]) -> Vec<io::Result<String>> {
        paths.par_iter().map(|p| self.fingerprint(p)).collect()
    }

    /// The library file already holding content with this fingerprint, if any.
    pub fn find_existing<L: Library + ?Sized>(
        &self,
        library: &L,
        fingerprint: &str,
    ) -> Result<Option<NodeId>> {
        Ok(library.find_files_by_fingerprint(fingerprint)?.into_iter().next())
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::weak(hasher::DEFAULT_CHECKSUM_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{ImportFile, LibraryStore};
    use std::fs;

    #[test]
    fn test_fingerprint_all_preserves_order() {
        let tmp = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..16)
            .map(|i| {
                let p = tmp.path().join(format!("{i}.bin"));
                fs::write(&p, format!("content {i}")).unwrap();
                p
            })
            .collect();

        let dedup = Deduplicator::default();
        let parallel = dedup.fingerprint_all(&paths);
        for (path, fp) in paths.iter().zip(parallel) {
            assert_eq!(fp.unwrap(), dedup.fingerprint(path).unwrap());
        }
    }

    #[test]
    fn test_fingerprint_all_reports_per_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.bin");
        fs::write(&good, b"x").unwrap();
        let paths = vec![tmp.path().join("missing.bin"), good];

        let results = Deduplicator::default().fingerprint_all(&paths);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_custom_fingerprint() {
        let dedup = Deduplicator::with_fingerprint(|p| {
            Ok(p.file_name().unwrap().to_string_lossy().to_string())
        });
        assert_eq!(dedup.fingerprint(Path::new("/a/IMG_1.JPG")).unwrap(), "IMG_1.JPG");
    }

    #[test]
    fn test_find_existing_returns_first_match() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = LibraryStore::open_in_memory().unwrap();
        let event = store.create_event("E").unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("b.jpg");
        fs::write(&a, b"same").unwrap();
        fs::write(&b, b"same").unwrap();
        let files = vec![
            ImportFile { path: a, fingerprint: "fp".into(), pair_key: None },
            ImportFile { path: b, fingerprint: "fp".into(), pair_key: None },
        ];
        let nodes = store.bulk_import(&files, event).unwrap();

        let dedup = Deduplicator::default();
        assert_eq!(dedup.find_existing(&store, "fp").unwrap(), nodes[0]);
        assert_eq!(dedup.find_existing(&store, "other").unwrap(), None);
    }
}
