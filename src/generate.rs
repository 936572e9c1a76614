//! Batch catalog generation over a local media tree.
//!
//! Produces the `books.json` the front end bakes in at build time: one
//! JSON object keyed by level code, each value the ordered book array.
//! The file is a regenerable cache — rebuilding from unchanged sources
//! yields an identical file.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;

use crate::catalog::{self, BuildReport};
use crate::cli::GenerateArgs;
use crate::formats::Book;
use crate::ingest::collect_media_files;
use crate::levels;

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let audio_by_level = scan_audio_tree(&args.audio_dir)?;

    let mut catalogs: BTreeMap<String, Vec<Book>> = BTreeMap::new();
    let mut reports: BTreeMap<String, BuildReport> = BTreeMap::new();

    for entry in std::fs::read_dir(&args.pdf_dir)
        .with_context(|| format!("read pdf tree: {}", args.pdf_dir.display()))?
    {
        let entry = entry?;
        let dir_name = entry.file_name().to_string_lossy().to_string();
        if dir_name.starts_with('.') || !entry.metadata()?.is_dir() {
            continue;
        }
        let Some(level) = levels::level_for_pdf_dir(&dir_name) else {
            tracing::warn!(dir = %dir_name, "skipping unrecognized pdf directory");
            continue;
        };

        // One broken level directory must not sink the rest of the run.
        let pdf_files = match list_file_names(&entry.path(), ".pdf") {
            Ok(files) => files,
            Err(err) => {
                tracing::error!(level, error = %format!("{err:#}"), "level scan failed");
                continue;
            }
        };

        let audio_files = audio_by_level.get(level).cloned().unwrap_or_default();
        let build = catalog::build_catalog(level, &pdf_files, &audio_files);

        tracing::info!(level, books = build.books.len(), "built level catalog");
        if !build.report.is_clean() {
            for skip in &build.report.skipped {
                tracing::warn!(level, file = %skip.filename, reason = ?skip.reason, "skipped file");
            }
            for overwrite in &build.report.audio_overwrites {
                tracing::warn!(
                    level,
                    key = %overwrite.match_key,
                    replaced = %overwrite.replaced,
                    kept = %overwrite.kept,
                    "duplicate audio key"
                );
            }
        }

        catalogs
            .entry(level.to_owned())
            .or_default()
            .extend(build.books);
        reports
            .entry(level.to_owned())
            .or_default()
            .merge(build.report);
    }

    let json = serde_json::to_string_pretty(&catalogs).context("serialize catalog")?;
    std::fs::write(&args.out, json)
        .with_context(|| format!("write catalog: {}", args.out.display()))?;
    tracing::info!(levels = catalogs.len(), out = %args.out.display(), "wrote catalog");

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&reports).context("serialize report")?;
        std::fs::write(report_path, json)
            .with_context(|| format!("write report: {}", report_path.display()))?;
        tracing::info!(out = %report_path.display(), "wrote diagnostics report");
    }

    Ok(())
}

fn scan_audio_tree(audio_dir: &Path) -> anyhow::Result<BTreeMap<&'static str, Vec<String>>> {
    let mut by_level: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();

    for entry in std::fs::read_dir(audio_dir)
        .with_context(|| format!("read audio tree: {}", audio_dir.display()))?
    {
        let entry = entry?;
        let dir_name = entry.file_name().to_string_lossy().to_string();
        if dir_name.starts_with('.') || !entry.metadata()?.is_dir() {
            continue;
        }
        let Some(level) = levels::level_for_audio_dir(&dir_name) else {
            tracing::warn!(dir = %dir_name, "skipping unrecognized audio directory");
            continue;
        };

        match list_file_names(&entry.path(), ".mp3") {
            Ok(files) => by_level.entry(level).or_default().extend(files),
            Err(err) => {
                tracing::error!(level, error = %format!("{err:#}"), "audio scan failed");
            }
        }
    }

    Ok(by_level)
}

fn list_file_names(dir: &Path, ext: &str) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for path in collect_media_files(dir, ext)? {
        let name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", path.display()))?
            .to_string_lossy()
            .to_string();
        names.push(name);
    }
    Ok(names)
}
