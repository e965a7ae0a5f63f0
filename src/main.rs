//! Main entry point for the printrospector CLI application.
//!
//! Loads the input (a mapped file or hex text) and dispatches on the data
//! kind. KIWAD archives are either listed or extracted into `--out`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use printrospector::cli::{DataKind, SerializeOpt};
use printrospector::{
    ArchiveSource, Cli, EntryFilter, ExtractOptions, NoProgress, Progress, WadExtractor,
};

/// Cells in the extraction progress bar.
const PROGRESS_CELLS: usize = 30;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.is_quiet() { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.data_kind {
        DataKind::Op => bail!("ObjectProperty processing is not implemented"),
        DataKind::Wad if cli.serialize_opt == SerializeOpt::Ser => {
            bail!("building KIWAD archives is not implemented")
        }
        DataKind::Wad => process_wad(&cli),
    }
}

/// List or extract a KIWAD archive based on CLI options.
fn process_wad(cli: &Cli) -> Result<()> {
    let source = ArchiveSource::load(&cli.input()).context("failed to load input")?;
    let options = ExtractOptions {
        verify_checksums: cli.verify_checksums,
        progress_interval: cli.progress_interval,
        ..ExtractOptions::default()
    };

    let mut extractor = WadExtractor::new(source.as_bytes(), options)
        .with_context(|| format!("failed to read KIWAD archive {}", source.describe()))?;

    if cli.list {
        list_entries(&extractor);
        return Ok(());
    }

    let output_dir = cli.out.clone().unwrap_or_else(|| PathBuf::from("."));
    let filter = EntryFilter::new(cli.files.clone());

    let summary = if cli.is_quiet() {
        extractor.extract_matching(&output_dir, &filter, &mut NoProgress)
    } else {
        extractor.extract_matching(&output_dir, &filter, &mut ProgressBar::default())
    }
    .with_context(|| format!("failed to extract {}", source.describe()))?;

    if !cli.is_quiet() {
        println!(
            "Extracted {} files ({}) to {}",
            summary.entries,
            format_size(summary.bytes_written),
            output_dir.display()
        );
    }
    Ok(())
}

/// Print the entry table with sizes, compression ratio and checksum.
fn list_entries(extractor: &WadExtractor<'_>) {
    let header = extractor.header();
    println!(
        "KIWAD version {}, {} entries{}",
        header.version,
        header.entry_count,
        header
            .flags
            .map(|f| format!(", flags {:#04x}", f.bits()))
            .unwrap_or_default()
    );
    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  Name",
        "Length", "Size", "Cmpr", "CRC32"
    );
    println!("{}", "-".repeat(60));

    let mut total_uncompressed = 0u64;
    let mut total_stored = 0u64;
    for entry in extractor.list_entries() {
        println!(
            "{:>10}  {:>10}  {:>4}%  {:08x}    {}",
            entry.uncompressed_size,
            entry.stored_size(),
            entry.compression_ratio(),
            entry.checksum,
            entry.relative_path
        );
        total_uncompressed += entry.uncompressed_size as u64;
        total_stored += entry.stored_size() as u64;
    }

    println!("{}", "-".repeat(60));
    println!(
        "{:>10}  {:>10}  {:>21}  {} files",
        total_uncompressed,
        total_stored,
        "",
        extractor.list_entries().len()
    );
}

/// Fixed-width progress bar redrawn in place on stderr.
#[derive(Default)]
struct ProgressBar {
    drawn: bool,
}

impl Progress for ProgressBar {
    fn begin(&mut self, total: usize) {
        eprintln!("Extracting KIWAD archive... ({total} files)");
    }

    fn update(&mut self, current: usize, total: usize) {
        let filled = if total == 0 {
            PROGRESS_CELLS
        } else {
            current * PROGRESS_CELLS / total
        };
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "\r[{}{}] {current}/{total}",
            "#".repeat(filled),
            ".".repeat(PROGRESS_CELLS - filled)
        );
        let _ = stderr.flush();
        self.drawn = true;
    }

    fn finish(&mut self) {
        if self.drawn {
            eprintln!();
        }
    }
}

/// Renders a byte count with a binary unit, e.g. `1.50 KiB`.
fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if size < 1024 {
        return format!("{size} bytes");
    }

    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
