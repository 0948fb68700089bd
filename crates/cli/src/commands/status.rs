use std::path::Path;

use anyhow::Result;
use aperture_import_core::library::store::{LibraryCounts, DATABASE_FILE};
use aperture_import_core::LibraryStore;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

pub fn run(library: &Path) -> Result<()> {
    if !library.join(DATABASE_FILE).is_file() {
        println!("No library at {}. Run `apimport import <bundle>` to create one.", library.display());
        return Ok(());
    }

    let store = LibraryStore::open(library)?;
    let counts = store.counts()?;
    let last_import = store
        .get_config("last_import_bundle")?
        .unwrap_or_else(|| "never".to_string());
    let created = store
        .get_config("created_at")?
        .unwrap_or_else(|| "unknown".to_string());

    println!();
    println!("  Library Status");
    println!("  ==============");
    println!();
    println!("   Location:    {}", library.display());
    println!("   Created:     {created}");
    println!("   Last import: {last_import}");
    println!();
    println!("{}", counts_table(&counts));
    println!();
    Ok(())
}

pub(crate) fn counts_table(counts: &LibraryCounts) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Kind"), Cell::new("Count")]);
    for (label, count) in [
        ("Events", counts.events),
        ("Groups", counts.groups),
        ("Collections", counts.collections),
        ("Files", counts.files),
        ("Hidden files", counts.hidden),
    ] {
        table.add_row(vec![Cell::new(label), Cell::new(count)]);
    }
    table
}
