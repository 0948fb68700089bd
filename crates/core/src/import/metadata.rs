use std::collections::{BTreeMap, HashSet};

use quick_xml::events::BytesText;
use quick_xml::Writer;
use serde::Serialize;
use tracing::{debug, warn};

use super::{FileNodes, ImportReport};
use crate::domain::{Keyword, SourceCatalog, Version};
use crate::error::{Error, HierarchyKind, Result};
use crate::library::Library;
use crate::ImportProgress;

/// Separator between the levels of a hierarchical keyword.
pub const HIERARCHY_SEPARATOR: &str = "|";

/// Keyword metadata for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataBlock {
    /// Flat keyword names (`dc:subject`).
    pub subject: Vec<String>,
    /// `|`-joined keyword paths, most specific first (`lr:hierarchicalSubject`).
    pub hierarchical_subject: Vec<String>,
}

impl MetadataBlock {
    pub fn is_empty(&self) -> bool {
        self.subject.is_empty() && self.hierarchical_subject.is_empty()
    }

    /// Render as an XMP packet. Empty lists are left out.
    pub fn to_xmp(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer
            .create_element("x:xmpmeta")
            .with_attribute(("xmlns:x", "adobe:ns:meta/"))
            .write_inner_content(|w| {
                w.create_element("rdf:RDF")
                    .with_attribute(("xmlns:rdf", RDF_NS))
                    .write_inner_content(|w| {
                        w.create_element("rdf:Description")
                            .with_attribute(("rdf:about", ""))
                            .with_attribute(("xmlns:dc", DC_NS))
                            .with_attribute(("xmlns:lr", LR_NS))
                            .write_inner_content(|w| {
                                write_seq(w, "dc:subject", &self.subject)?;
                                write_seq(w, "lr:hierarchicalSubject", &self.hierarchical_subject)
                            })?;
                        Ok::<(), quick_xml::Error>(())
                    })?;
                Ok::<(), quick_xml::Error>(())
            })?;

        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const LR_NS: &str = "http://ns.adobe.com/lightroom/1.0/";

/// `<element><rdf:Seq><rdf:li>..</rdf:li></rdf:Seq></element>`, or nothing for an empty list.
fn write_seq(w: &mut Writer<Vec<u8>>, element: &str, values: &[String]) -> quick_xml::Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    w.create_element(element).write_inner_content(|w| {
        w.create_element("rdf:Seq").write_inner_content(|w| {
            for value in values {
                w.create_element("rdf:li")
                    .write_text_content(BytesText::new(value))?;
            }
            Ok::<(), quick_xml::Error>(())
        })?;
        Ok::<(), quick_xml::Error>(())
    })?;
    Ok(())
}

/// Walk from a keyword to its root, joining names most specific first.
///
/// Returns `Ok(None)` for an unknown keyword. A parent UUID that is not in
/// `keywords` ends the path. Cycles and chains longer than `max_depth` fail
/// with [`Error::HierarchyCycle`].
pub fn hierarchical_keyword(
    keyword_uuid: &str,
    keywords: &BTreeMap<String, Keyword>,
    max_depth: usize,
) -> Result<Option<String>> {
    let mut names: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();
    let mut current = keywords.get(keyword_uuid);
    if current.is_none() {
        return Ok(None);
    }

    while let Some(keyword) = current {
        if !seen.insert(keyword.uuid.as_str()) || names.len() >= max_depth {
            return Err(Error::HierarchyCycle {
                kind: HierarchyKind::Keyword,
                uuid: keyword_uuid.to_string(),
                limit: max_depth,
            });
        }
        names.push(&keyword.name);
        current = keyword
            .parent_uuid
            .as_deref()
            .and_then(|parent| keywords.get(parent));
    }

    Ok(Some(names.join(HIERARCHY_SEPARATOR)))
}

/// Build the metadata block of a version. Keywords that cannot be resolved are
/// skipped and counted.
pub fn synthesize(
    version: &Version,
    keywords: &BTreeMap<String, Keyword>,
    max_depth: usize,
    report: &mut ImportReport,
) -> Result<MetadataBlock> {
    let mut block = MetadataBlock::default();

    for uuid in &version.keyword_uuids {
        match hierarchical_keyword(uuid, keywords, max_depth) {
            Ok(Some(path)) => {
                if let Some(keyword) = keywords.get(uuid) {
                    block.subject.push(keyword.name.clone());
                }
                block.hierarchical_subject.push(path);
            }
            Ok(None) => {
                warn!(version = %version.uuid, keyword = %uuid, "unknown keyword, skipping");
                report.keywords_skipped += 1;
            }
            Err(e @ Error::HierarchyCycle { .. }) => {
                warn!(version = %version.uuid, "{e}, skipping keyword");
                report.keywords_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(block)
}

/// Write keyword metadata for every version whose primary master is in the library.
///
/// A failed write is counted and logged; the remaining files are still processed.
pub fn apply_metadata<L: Library + ?Sized>(
    library: &mut L,
    catalog: &SourceCatalog,
    filenodes: &FileNodes,
    max_depth: usize,
    report: &mut ImportReport,
    emit: &mut dyn FnMut(ImportProgress),
) -> Result<()> {
    for version in catalog.versions.values() {
        if version.keyword_uuids.is_empty() || !catalog.masters.contains_key(&version.master_uuid) {
            continue;
        }
        let Some(node) = filenodes.get(&version.master_uuid) else {
            continue;
        };

        let block = synthesize(version, &catalog.keywords, max_depth, report)?;
        if block.is_empty() {
            continue;
        }

        match library.write_metadata(node, &block) {
            Ok(()) => {
                debug!(version = %version.uuid, %node, keywords = block.subject.len(), "metadata written");
                report.metadata_written += 1;
                emit(ImportProgress::MetadataWritten {
                    version_uuid: version.uuid.clone(),
                });
            }
            Err(e @ (Error::MetadataWrite { .. } | Error::NodeNotFound(_) | Error::Io(_) | Error::Xml(_))) => {
                warn!(version = %version.uuid, %node, "{e}");
                report.metadata_failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(id: i64, uuid: &str, name: &str, parent: Option<&str>) -> Keyword {
        Keyword {
            id,
            uuid: uuid.into(),
            name: name.into(),
            parent_uuid: parent.map(String::from),
        }
    }

    fn keywords(list: Vec<Keyword>) -> BTreeMap<String, Keyword> {
        list.into_iter().map(|k| (k.uuid.clone(), k)).collect()
    }

    fn version_with(keyword_uuids: &[&str]) -> Version {
        Version {
            uuid: "v2".into(),
            model_id: 2,
            file_name: None,
            master_uuid: "m2".into(),
            raw_master_uuid: None,
            non_raw_master_uuid: Some("m2".into()),
            project_uuid: "p1".into(),
            main_rating: 0,
            is_hidden: false,
            is_flagged: false,
            exif_latitude: None,
            exif_longitude: None,
            keyword_uuids: keyword_uuids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_hierarchical_keyword_most_specific_first() {
        let kws = keywords(vec![
            keyword(1, "k0", "Travel", None),
            keyword(2, "k1", "Beach", Some("k0")),
        ]);
        assert_eq!(hierarchical_keyword("k1", &kws, 64).unwrap().as_deref(), Some("Beach|Travel"));
        assert_eq!(hierarchical_keyword("k0", &kws, 64).unwrap().as_deref(), Some("Travel"));
        assert_eq!(hierarchical_keyword("nope", &kws, 64).unwrap(), None);
    }

    #[test]
    fn test_hierarchical_keyword_dangling_parent_ends_path() {
        let kws = keywords(vec![keyword(1, "k1", "Beach", Some("gone"))]);
        assert_eq!(hierarchical_keyword("k1", &kws, 64).unwrap().as_deref(), Some("Beach"));
    }

    #[test]
    fn test_hierarchical_keyword_cycle() {
        let kws = keywords(vec![
            keyword(1, "a", "A", Some("b")),
            keyword(2, "b", "B", Some("a")),
        ]);
        let err = hierarchical_keyword("a", &kws, 64).unwrap_err();
        assert!(matches!(err, Error::HierarchyCycle { kind: HierarchyKind::Keyword, .. }));

        let self_loop = keywords(vec![keyword(1, "s", "Self", Some("s"))]);
        assert!(hierarchical_keyword("s", &self_loop, 64).is_err());
    }

    #[test]
    fn test_synthesize_flat_and_hierarchical() {
        let kws = keywords(vec![
            keyword(1, "k0", "Travel", None),
            keyword(2, "k1", "Beach", Some("k0")),
        ]);
        let mut report = ImportReport::default();
        let block = synthesize(&version_with(&["k1"]), &kws, 64, &mut report).unwrap();
        assert_eq!(block.subject, vec!["Beach"]);
        assert_eq!(block.hierarchical_subject, vec!["Beach|Travel"]);
    }

    #[test]
    fn test_synthesize_keeps_duplicates_and_skips_bad_chains() {
        let kws = keywords(vec![
            keyword(1, "k0", "Travel", None),
            keyword(2, "a", "A", Some("b")),
            keyword(3, "b", "B", Some("a")),
        ]);
        let mut report = ImportReport::default();
        let block = synthesize(&version_with(&["k0", "a", "k0", "missing"]), &kws, 64, &mut report).unwrap();
        assert_eq!(block.subject, vec!["Travel", "Travel"]);
        assert_eq!(block.hierarchical_subject, vec!["Travel", "Travel"]);
        assert_eq!(report.keywords_skipped, 2);
    }

    #[test]
    fn test_first_segment_is_keyword_name() {
        let kws = keywords(vec![
            keyword(1, "r", "Places", None),
            keyword(2, "c", "France", Some("r")),
            keyword(3, "l", "Paris", Some("c")),
        ]);
        for k in kws.values() {
            let path = hierarchical_keyword(&k.uuid, &kws, 64).unwrap().unwrap();
            assert_eq!(path.split(HIERARCHY_SEPARATOR).next(), Some(k.name.as_str()));
        }
    }

    #[test]
    fn test_xmp_rendering() {
        let block = MetadataBlock {
            subject: vec!["Fish & Chips".into()],
            hierarchical_subject: vec!["Fish & Chips|Food".into()],
        };
        let xmp = block.to_xmp().unwrap();
        assert!(xmp.contains("<dc:subject><rdf:Seq><rdf:li>Fish &amp; Chips</rdf:li></rdf:Seq></dc:subject>"));
        assert!(xmp.contains("<lr:hierarchicalSubject><rdf:Seq><rdf:li>Fish &amp; Chips|Food</rdf:li>"));
        assert!(xmp.starts_with("<x:xmpmeta"));
    }

    #[test]
    fn test_xmp_skips_empty_lists() {
        let block = MetadataBlock {
            subject: vec!["A".into()],
            hierarchical_subject: vec![],
        };
        let xmp = block.to_xmp().unwrap();
        assert!(xmp.contains("dc:subject"));
        assert!(!xmp.contains("hierarchicalSubject>"));
        assert!(MetadataBlock::default().is_empty());
    }

    #[test]
    fn test_xmp_keeps_markup_in_keywords_as_text() {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let block = MetadataBlock {
            subject: vec!["</rdf:li><evil/>".into(), "Plain".into()],
            hierarchical_subject: vec!["a\"b|<c>".into()],
        };
        let xmp = block.to_xmp().unwrap();
        assert!(xmp.contains("&lt;/rdf:li&gt;&lt;evil/&gt;"));

        let mut reader = Reader::from_str(&xmp);
        let mut items = Vec::new();
        let mut in_li = false;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"rdf:li" => in_li = true,
                Event::End(e) if e.name().as_ref() == b"rdf:li" => in_li = false,
                Event::Text(t) if in_li => items.push(t.unescape().unwrap().into_owned()),
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"evil" => panic!("keyword escaped its element"),
                Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(items, vec!["</rdf:li><evil/>", "Plain", "a\"b|<c>"]);
    }
}
