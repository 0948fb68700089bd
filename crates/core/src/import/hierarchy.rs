//! Folder and album placement: source folders become nested groups, albums
//! become collections inside them. Existing nodes are found by caption and
//! reused so that running an import twice does not duplicate the hierarchy.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::ImportReport;
use crate::domain::{Album, Folder};
use crate::error::{Error, HierarchyKind, Result};
use crate::library::{Library, NodeId, NodeKind, Scope};

/// Kinds of container looked up by caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Group,
    Collection,
}

impl ContainerKind {
    pub fn node_kind(self) -> NodeKind {
        match self {
            ContainerKind::Group => NodeKind::Group,
            ContainerKind::Collection => NodeKind::Collection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: NodeId,
    pub created: bool,
}

/// Return the first child of `scope` with the given kind and caption, creating it if absent.
pub fn find_or_create<L: Library + ?Sized>(
    library: &mut L,
    scope: Scope,
    kind: ContainerKind,
    caption: &str,
) -> Result<Resolved> {
    let existing = library
        .children(scope)?
        .into_iter()
        .find(|n| n.kind == kind.node_kind() && n.caption == caption);

    if let Some(node) = existing {
        debug!(kind = %node.kind, caption, id = %node.id, "reusing existing node");
        return Ok(Resolved {
            id: node.id,
            created: false,
        });
    }

    let id = match kind {
        ContainerKind::Group => library.create_group(caption, scope)?,
        ContainerKind::Collection => library.create_collection(caption, scope)?,
    };
    debug!(kind = %kind.node_kind(), caption, %id, "created node");
    Ok(Resolved { id, created: true })
}

/// The chain of folders that map to groups, outermost first.
///
/// The walk stops at a root marker, a missing parent UUID, or a parent that is
/// not in `folders`. A chain that revisits a folder or exceeds `max_depth`
/// fails with [`Error::HierarchyCycle`].
pub fn folder_chain<'a>(
    folder: Option<&'a Folder>,
    folders: &'a BTreeMap<String, Folder>,
    max_depth: usize,
) -> Result<Vec<&'a Folder>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = folder;

    while let Some(f) = current {
        if f.is_top_level() {
            break;
        }
        if !seen.insert(f.uuid.as_str()) || chain.len() >= max_depth {
            return Err(Error::HierarchyCycle {
                kind: HierarchyKind::Folder,
                uuid: folder.map(|f| f.uuid.clone()).unwrap_or_default(),
                limit: max_depth,
            });
        }
        chain.push(f);
        current = f
            .parent_folder_uuid
            .as_deref()
            .and_then(|parent| folders.get(parent));
    }

    chain.reverse();
    Ok(chain)
}

/// Group node for a source folder, or `None` when the folder sits at the library root.
pub fn resolve_group_path<L: Library + ?Sized>(
    library: &mut L,
    folder: Option<&Folder>,
    folders: &BTreeMap<String, Folder>,
    max_depth: usize,
    report: &mut ImportReport,
) -> Result<Option<NodeId>> {
    let mut group = None;
    for f in folder_chain(folder, folders, max_depth)? {
        let scope = group.map_or(Scope::Root, Scope::Group);
        let resolved = find_or_create(library, scope, ContainerKind::Group, &f.name)?;
        if resolved.created {
            report.groups_created += 1;
        } else {
            report.groups_reused += 1;
        }
        group = Some(resolved.id);
    }
    Ok(group)
}

/// Collection node for an album, placed under the group of the album's folder.
pub fn resolve_or_create_collection<L: Library + ?Sized>(
    library: &mut L,
    album: &Album,
    folders: &BTreeMap<String, Folder>,
    max_depth: usize,
    report: &mut ImportReport,
) -> Result<Resolved> {
    let group = resolve_group_path(
        library,
        folders.get(&album.folder_uuid),
        folders,
        max_depth,
        report,
    )?;
    let scope = group.map_or(Scope::Root, Scope::Group);
    let resolved = find_or_create(library, scope, ContainerKind::Collection, &album.name)?;
    if resolved.created {
        report.collections_created += 1;
    } else {
        report.collections_reused += 1;
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibraryStore;

    fn folder(uuid: &str, name: &str, parent: Option<&str>) -> Folder {
        Folder {
            uuid: uuid.into(),
            name: name.into(),
            folder_type: 1,
            parent_folder_uuid: parent.map(String::from),
            implicit_album_uuid: None,
        }
    }

    fn folders(list: Vec<Folder>) -> BTreeMap<String, Folder> {
        list.into_iter().map(|f| (f.uuid.clone(), f)).collect()
    }

    fn album(name: &str, folder_uuid: &str) -> Album {
        Album {
            uuid: format!("a-{name}"),
            model_id: 1,
            name: name.into(),
            album_type: 1,
            folder_uuid: folder_uuid.into(),
            versions: vec![],
        }
    }

    // ── find_or_create ──────────────────────────────────────────

    #[test]
    fn test_find_or_create_reuses_by_kind_and_caption() {
        let mut lib = LibraryStore::open_in_memory().unwrap();
        let first = find_or_create(&mut lib, Scope::Root, ContainerKind::Group, "Trips").unwrap();
        assert!(first.created);
        let again = find_or_create(&mut lib, Scope::Root, ContainerKind::Group, "Trips").unwrap();
        assert!(!again.created);
        assert_eq!(first.id, again.id);

        // Same caption, different kind: a separate node
        let coll = find_or_create(&mut lib, Scope::Root, ContainerKind::Collection, "Trips").unwrap();
        assert!(coll.created);
        assert_ne!(coll.id, first.id);
    }

    #[test]
    fn test_find_or_create_is_scoped() {
        let mut lib = LibraryStore::open_in_memory().unwrap();
        let outer = find_or_create(&mut lib, Scope::Root, ContainerKind::Group, "A").unwrap();
        let inner = find_or_create(&mut lib, Scope::Group(outer.id), ContainerKind::Group, "A").unwrap();
        assert!(inner.created);
        assert_ne!(outer.id, inner.id);
    }

    #[test]
    fn test_find_or_create_picks_first_duplicate() {
        let mut lib = LibraryStore::open_in_memory().unwrap();
        let first = lib.create_collection("Dup", Scope::Root).unwrap();
        lib.create_collection("Dup", Scope::Root).unwrap();
        let found = find_or_create(&mut lib, Scope::Root, ContainerKind::Collection, "Dup").unwrap();
        assert_eq!(found.id, first);
    }

    // ── folder_chain ────────────────────────────────────────────

    #[test]
    fn test_chain_stops_at_root_markers() {
        let fs = folders(vec![
            folder("top", "Top", Some("TopLevelAlbums")),
            folder("mid", "Mid", Some("top")),
            folder("leaf", "Leaf", Some("mid")),
        ]);
        let chain = folder_chain(fs.get("leaf"), &fs, 64).unwrap();
        let names: Vec<&str> = chain.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Mid", "Leaf"]);

        assert!(folder_chain(fs.get("top"), &fs, 64).unwrap().is_empty());
        assert!(folder_chain(None, &fs, 64).unwrap().is_empty());
    }

    #[test]
    fn test_chain_missing_parent_is_root_scope() {
        let fs = folders(vec![folder("f", "Orphan", Some("gone")), folder("n", "NoParent", None)]);
        let names = |uuid: &str| -> Vec<String> {
            folder_chain(fs.get(uuid), &fs, 64)
                .unwrap()
                .iter()
                .map(|f| f.name.clone())
                .collect()
        };
        assert_eq!(names("f"), vec!["Orphan"]);
        assert_eq!(names("n"), vec!["NoParent"]);
    }

    #[test]
    fn test_chain_cycle_detected() {
        let fs = folders(vec![folder("a", "A", Some("b")), folder("b", "B", Some("a"))]);
        let err = folder_chain(fs.get("a"), &fs, 64).unwrap_err();
        assert!(matches!(
            err,
            Error::HierarchyCycle { kind: HierarchyKind::Folder, ref uuid, .. } if uuid == "a"
        ));
    }

    #[test]
    fn test_chain_depth_limit() {
        let fs = folders(vec![
            folder("a", "A", Some("LibraryFolder")),
            folder("b", "B", Some("a")),
            folder("c", "C", Some("b")),
        ]);
        assert_eq!(folder_chain(fs.get("c"), &fs, 3).unwrap().len(), 2);
        assert!(folder_chain(fs.get("c"), &fs, 1).is_err());
    }

    // ── resolve_group_path ──────────────────────────────────────

    #[test]
    fn test_resolve_group_path_builds_nested_groups_once() {
        let fs = folders(vec![
            folder("top", "Top", Some("TopLevelAlbums")),
            folder("y", "2014", Some("top")),
            folder("m", "July", Some("y")),
        ]);
        let mut lib = LibraryStore::open_in_memory().unwrap();
        let mut report = ImportReport::default();

        let g = resolve_group_path(&mut lib, fs.get("m"), &fs, 64, &mut report)
            .unwrap()
            .unwrap();
        assert_eq!(report.groups_created, 2);
        assert_eq!(lib.node(g).unwrap().caption, "July");

        let root = lib.children(Scope::Root).unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].caption, "2014");
        let inner = lib.children(Scope::Group(root[0].id)).unwrap();
        assert_eq!(inner[0].id, g);

        let again = resolve_group_path(&mut lib, fs.get("m"), &fs, 64, &mut report).unwrap();
        assert_eq!(again, Some(g));
        assert_eq!(report.groups_created, 2);
        assert_eq!(report.groups_reused, 2);
        assert_eq!(lib.counts().unwrap().groups, 2);
    }

    #[test]
    fn test_resolve_group_path_top_level_is_none() {
        let fs = folders(vec![folder("top", "Top", Some("LibraryFolder"))]);
        let mut lib = LibraryStore::open_in_memory().unwrap();
        let mut report = ImportReport::default();
        let g = resolve_group_path(&mut lib, fs.get("top"), &fs, 64, &mut report).unwrap();
        assert_eq!(g, None);
        assert_eq!(lib.counts().unwrap().groups, 0);
    }

    // ── resolve_or_create_collection ────────────────────────────

    #[test]
    fn test_collection_at_root_for_top_level_folder() {
        let fs = folders(vec![folder("top", "Top", Some("TopLevelAlbums"))]);
        let mut lib = LibraryStore::open_in_memory().unwrap();
        let mut report = ImportReport::default();

        let c = resolve_or_create_collection(&mut lib, &album("Best", "top"), &fs, 64, &mut report).unwrap();
        assert!(c.created);
        let root = lib.children(Scope::Root).unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].kind, NodeKind::Collection);
        assert_eq!(root[0].caption, "Best");

        let again = resolve_or_create_collection(&mut lib, &album("Best", "top"), &fs, 64, &mut report).unwrap();
        assert_eq!(again.id, c.id);
        assert_eq!(report.collections_created, 1);
        assert_eq!(report.collections_reused, 1);
    }

    #[test]
    fn test_collection_nested_under_group() {
        let fs = folders(vec![
            folder("top", "Top", Some("TopLevelAlbums")),
            folder("fam", "Family", Some("top")),
        ]);
        let mut lib = LibraryStore::open_in_memory().unwrap();
        let mut report = ImportReport::default();

        let c = resolve_or_create_collection(&mut lib, &album("Kids", "fam"), &fs, 64, &mut report).unwrap();
        let root = lib.children(Scope::Root).unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].kind, NodeKind::Group);
        let inner = lib.children(Scope::Group(root[0].id)).unwrap();
        assert_eq!(inner[0].id, c.id);
    }
}
