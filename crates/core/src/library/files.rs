use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory holding the copied masters of one event: `root/Events/<event>`.
pub fn event_dir(root: &Path, event: &str) -> PathBuf {
    root.join("Events").join(sanitize_component(event))
}

/// Make a caption usable as a single path component.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();

    match cleaned {
        "" => "Untitled".to_string(),
        "." | ".." => "_".to_string(),
        other => other.to_string(),
    }
}

/// Pick the path a master is stored at inside `dir`.
///
/// Name collisions get `_1`, `_2`, ... suffixes. An existing file for which
/// `is_same` returns true is returned as-is, so an interrupted import can be
/// resumed without a second copy.
///
/// Sidecars are named after the stem, so a free name is still skipped while
/// another file in `dir` has the same stem, unless `may_share_stem` accepts
/// that file as a partner.
pub fn build_target_path(
    dir: &Path,
    original_path: &Path,
    is_same: impl Fn(&Path) -> bool,
    may_share_stem: impl Fn(&Path) -> bool,
) -> PathBuf {
    let file_stem = original_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();
    let ext = original_path
        .extension()
        .unwrap_or_default()
        .to_string_lossy();

    let mut counter = 0u32;
    loop {
        let stem = if counter == 0 {
            file_stem.to_string()
        } else {
            format!("{}_{}", file_stem, counter)
        };
        let target = if ext.is_empty() {
            dir.join(&stem)
        } else {
            dir.join(format!("{}.{}", stem, ext))
        };

        if target.exists() {
            if is_same(&target) {
                return target;
            }
        } else if stem_owners(dir, &stem).iter().all(|p| may_share_stem(p)) {
            return target;
        }
        counter += 1;
    }
}

/// Files in `dir`, sidecars excluded, whose stem is `stem`.
fn stem_owners(dir: &Path, stem: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.file_stem().is_some_and(|s| s.to_string_lossy() == stem))
        .filter(|path| !is_sidecar(path))
        .collect()
}

fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("xmp"))
}

/// Copy a master into the library, creating parent directories as needed.
/// Returns Ok(false) if the target already exists, Ok(true) if copied.
pub fn copy_into_library(source: &Path, target: &Path) -> Result<bool> {
    if target.exists() {
        return Ok(false);
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, target)?;
    Ok(true)
}

/// XMP sidecar location for a stored file. Only pair partners share a stem, and so a sidecar.
pub fn sidecar_path(path: &Path) -> PathBuf {
    path.with_extension("xmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same_size(size: u64) -> impl Fn(&Path) -> bool {
        move |p: &Path| p.metadata().map(|m| m.len() == size).unwrap_or(false)
    }

    // ── sanitize_component ──────────────────────────────────────

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("Summer 2014"), "Summer 2014");
        assert_eq!(sanitize_component("a/b:c\\d"), "a_b_c_d");
        assert_eq!(sanitize_component("  "), "Untitled");
        assert_eq!(sanitize_component(".."), "_");
    }

    #[test]
    fn test_event_dir() {
        let dir = event_dir(Path::new("/lib"), "Trip/Paris");
        assert_eq!(dir, PathBuf::from("/lib/Events/Trip_Paris"));
    }

    // ── build_target_path ───────────────────────────────────────

    #[test]
    fn test_build_target_path_basic() {
        let target = build_target_path(Path::new("/lib/Events/E"), Path::new("/src/IMG_1.CR2"), |_| false, |_| false);
        assert_eq!(target, PathBuf::from("/lib/Events/E/IMG_1.CR2"));
    }

    #[test]
    fn test_build_target_path_collision_different_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"hello").unwrap();

        let target = build_target_path(tmp.path(), Path::new("/src/photo.jpg"), same_size(1000), |_| false);
        assert_eq!(target.file_name().unwrap().to_string_lossy(), "photo_1.jpg");
    }

    #[test]
    fn test_build_target_path_same_file_returns_existing() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"hello").unwrap();

        let target = build_target_path(tmp.path(), Path::new("/src/photo.jpg"), same_size(5), |_| false);
        assert_eq!(target.file_name().unwrap().to_string_lossy(), "photo.jpg");
    }

    #[test]
    fn test_build_target_path_multiple_collisions() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"a").unwrap();
        fs::write(tmp.path().join("photo_1.jpg"), b"ab").unwrap();
        fs::write(tmp.path().join("photo_2.jpg"), b"abc").unwrap();

        let target = build_target_path(tmp.path(), Path::new("/src/photo.jpg"), same_size(9999), |_| false);
        assert_eq!(target.file_name().unwrap().to_string_lossy(), "photo_3.jpg");
    }

    #[test]
    fn test_build_target_path_no_extension() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("README"), b"a").unwrap();

        let target = build_target_path(tmp.path(), Path::new("/src/README"), |_| false, |_| false);
        assert_eq!(target.file_name().unwrap().to_string_lossy(), "README_1");
    }

    #[test]
    fn test_build_target_path_avoids_foreign_stem() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("IMG_1.CR2"), b"raw").unwrap();
        fs::write(tmp.path().join("IMG_1.xmp"), b"<x/>").unwrap();

        let target = build_target_path(tmp.path(), Path::new("/src/IMG_1.JPG"), |_| false, |_| false);
        assert_eq!(target.file_name().unwrap().to_string_lossy(), "IMG_1_1.JPG");
    }

    #[test]
    fn test_build_target_path_partner_shares_stem() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("IMG_1.CR2"), b"raw").unwrap();

        let partner = tmp.path().join("IMG_1.CR2");
        let target = build_target_path(tmp.path(), Path::new("/src/IMG_1.JPG"), |_| false, |p| p == partner.as_path());
        assert_eq!(target.file_name().unwrap().to_string_lossy(), "IMG_1.JPG");
    }

    // ── copy_into_library ───────────────────────────────────────

    #[test]
    fn test_copy_creates_dirs_and_copies() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source.jpg");
        fs::write(&source, b"photo data").unwrap();

        let target = tmp.path().join("Events/Trip/target.jpg");
        assert!(copy_into_library(&source, &target).unwrap());
        assert_eq!(fs::read(&target).unwrap(), b"photo data");
    }

    #[test]
    fn test_copy_skips_existing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source.jpg");
        fs::write(&source, b"photo data").unwrap();
        let target = tmp.path().join("target.jpg");
        fs::write(&target, b"old  data!").unwrap();

        assert!(!copy_into_library(&source, &target).unwrap());
        assert_eq!(fs::read(&target).unwrap(), b"old  data!");
    }

    #[test]
    fn test_copy_source_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let result = copy_into_library(&tmp.path().join("missing.jpg"), &tmp.path().join("t.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn test_sidecar_path_follows_stem() {
        assert_eq!(sidecar_path(Path::new("/e/IMG_1.CR2")), PathBuf::from("/e/IMG_1.xmp"));
        assert_eq!(sidecar_path(Path::new("/e/IMG_1.JPG")), PathBuf::from("/e/IMG_1.xmp"));
    }
}
