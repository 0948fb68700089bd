use std::path::Path;

use anyhow::Result;
use aperture_import_core::{ApertureBundle, CatalogStats};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

pub fn run(bundle: &Path, json: bool) -> Result<()> {
    let bundle = ApertureBundle::open(bundle)?;
    let catalog = bundle.catalog()?.load()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let stats = CatalogStats::from(&catalog);
    println!();
    println!("  {}", bundle.root().display());
    println!();
    println!("{}", stats_table(&stats));
    if stats.referenced_masters > 0 {
        println!(
            "  {} referenced masters live outside the bundle and will be skipped.",
            stats.referenced_masters
        );
    }
    println!();
    Ok(())
}

pub(crate) fn stats_table(stats: &CatalogStats) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Relation"), Cell::new("Rows")]);
    for (label, count) in [
        ("Folders", stats.folders),
        ("Projects", stats.projects),
        ("Albums", stats.albums),
        ("Keywords", stats.keywords),
        ("Versions", stats.versions),
        ("Masters", stats.masters),
        ("Referenced masters", stats.referenced_masters),
    ] {
        table.add_row(vec![Cell::new(label), Cell::new(count)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_table_rows() {
        let stats = CatalogStats {
            folders: 4,
            projects: 2,
            albums: 3,
            keywords: 0,
            versions: 10,
            masters: 11,
            referenced_masters: 1,
        };
        let table = stats_table(&stats);
        assert_eq!(table.row_iter().count(), 7);
        assert!(table.to_string().contains("Referenced masters"));
    }
}
