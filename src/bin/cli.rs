//! aup CLI: import a legacy Audacity project headlessly and summarize it.
//!
//! Usage:
//!   aup-cli path/to/song.aup
//!   aup-cli path/to/song.aup --dirty --verbose

use std::path::PathBuf;
use std::process::ExitCode;

use aup_host::{HostProject, ImportProgress};
use aup_ir::Track;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "aup-cli", about = "Import a legacy .aup project and print a summary")]
struct Args {
    /// Project file to import
    path: PathBuf,

    /// Treat the host project as modified, so view settings are not applied
    #[arg(long)]
    dirty: bool,

    /// Log import progress (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let mut host = HostProject::new();
    host.set_dirty(args.dirty);

    let mut progress = ImportProgress::new();
    let summary = match host.import_file_with(&args.path, &mut progress) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Failed to import {}: {}", args.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("Project:  {}", args.path.display());
    println!("Tracks:   {}", summary.tracks);
    println!("Blocks:   {} ({} samples)", summary.blocks, summary.total_samples);
    println!("Warnings: {}", summary.warnings);
    println!();

    for track in host.tracks() {
        println!("  {}", describe(track));
    }

    if !host.tags().is_empty() {
        println!();
        for (name, value) in host.tags().iter() {
            println!("  {name} = {value}");
        }
    }

    let applied = host.applied_settings();
    if !applied.is_empty() {
        println!();
        println!("View settings applied: {}", applied.len());
    }

    for (severity, message) in host.reports() {
        println!();
        println!("[{severity}] {}", message.replace("\n\n", " "));
    }

    ExitCode::SUCCESS
}

fn describe(track: &Track) -> String {
    match track {
        Track::Wave(w) => format!(
            "wave  {:<20} {} Hz, {} clips, {} samples",
            w.name,
            w.rate,
            w.clips.len(),
            w.num_samples()
        ),
        Track::Label(l) => format!("label {:<20} {} labels", l.name, l.labels.len()),
        Track::Note(n) => format!("note  {:<20} offset {:.3}s", n.name, n.offset),
        Track::Time(t) => format!(
            "time  {:<20} range {}..{}, {} points",
            t.name,
            t.range_lower,
            t.range_upper,
            t.envelope.points.len()
        ),
    }
}
