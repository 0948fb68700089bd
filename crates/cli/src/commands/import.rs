use std::path::Path;

use anyhow::{Context, Result};
use aperture_import_core::{
    ApertureBundle, ImportConfig, ImportProgress, ImportReport, Importer, LibraryStore, Phase,
};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};

pub fn run(library: &Path, bundle: &Path, in_place: bool, max_depth: usize) -> Result<()> {
    let bundle = ApertureBundle::open(bundle)?;
    let config = ImportConfig {
        max_hierarchy_depth: max_depth,
        ..ImportConfig::default()
    };

    let mut store = LibraryStore::open(library)
        .with_context(|| format!("cannot open library at {}", library.display()))?
        .with_copy_files(!in_place)
        .with_checksum_window(config.checksum_window);

    let bundle_display = bundle.root().display().to_string();
    let importer = Importer::new(bundle, config);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let report = importer.run(
        &mut store,
        Some(&mut |progress| match progress {
            ImportProgress::PhaseStart { phase, total } => {
                pb.set_length(total as u64);
                pb.set_position(0);
                pb.set_message(phase_message(phase));
            }
            ImportProgress::EventCreated { name, files } => {
                pb.inc(1);
                pb.set_message(format!("{name} ({files} files)"));
            }
            ImportProgress::EventSkipped { .. } => pb.inc(1),
            ImportProgress::CollectionResolved { name, .. } => {
                pb.inc(1);
                pb.set_message(name);
            }
            ImportProgress::MetadataWritten { .. } => pb.inc(1),
            ImportProgress::PhaseComplete { phase } => {
                pb.finish_with_message(format!("{phase} done"));
            }
            ImportProgress::FileImported { .. }
            | ImportProgress::FileMatched { .. }
            | ImportProgress::FileFailed { .. } => {}
        }),
    )?;

    store.set_config("last_import_bundle", &bundle_display)?;

    println!("{}", report_table(&report));
    if report.is_clean() {
        println!("Import complete.");
    } else {
        println!("Import complete with skipped items. Set RUST_LOG=aperture_import_core=warn for details.");
    }
    Ok(())
}

fn phase_message(phase: Phase) -> String {
    match phase {
        Phase::ReadCatalog => "Reading catalog...".to_string(),
        Phase::Projects => "Importing projects...".to_string(),
        Phase::Collections => "Building collections...".to_string(),
        Phase::Metadata => "Writing keywords...".to_string(),
    }
}

pub(crate) fn report_table(report: &ImportReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Step"), Cell::new("Count")]);

    for (label, count) in report.rows() {
        let cell = Cell::new(count);
        let failure = label.contains("failed") || label.contains("skipped") || label.contains("Missing");
        let cell = if failure && count > 0 {
            cell.fg(Color::Yellow)
        } else {
            cell
        };
        table.add_row(vec![Cell::new(label), cell]);
    }
    table
}
