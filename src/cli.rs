use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a local media tree and write the per-level book catalog.
    Generate(GenerateArgs),
    /// Upload new PDF/audio files to object storage.
    Upload(UploadArgs),
    /// Probe stored objects under one level prefix.
    Check(CheckArgs),
    /// Generate quiz/vocabulary content for catalogued books via an LLM.
    Content(ContentArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaKind {
    Pdf,
    Audio,
}

impl MediaKind {
    /// Storage key prefix segment (`pdf/...` or `audio/...`).
    pub fn prefix(self) -> &'static str {
        match self {
            MediaKind::Pdf => "pdf",
            MediaKind::Audio => "audio",
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Root directory of the PDF tree (one decorated directory per level).
    #[arg(long)]
    pub pdf_dir: PathBuf,

    /// Root directory of the audio tree.
    #[arg(long)]
    pub audio_dir: PathBuf,

    /// Output path for the catalog JSON (object keyed by level code).
    #[arg(long)]
    pub out: PathBuf,

    /// Also write the per-level diagnostics report (skips, overwrites).
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Root directory of the PDF tree.
    #[arg(long)]
    pub pdf_dir: PathBuf,

    /// Root directory of the audio tree.
    #[arg(long)]
    pub audio_dir: PathBuf,

    /// Target bucket name (omit to copy into a local store directory).
    #[arg(long)]
    pub bucket: Option<String>,

    /// Local store directory used when no bucket is given.
    #[arg(long, default_value = "media")]
    pub data_dir: PathBuf,

    /// Maximum concurrent uploads.
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Level code to probe (e.g. `J`).
    #[arg(long)]
    pub level: String,

    #[arg(long, value_enum, default_value = "pdf")]
    pub kind: MediaKind,

    /// Show at most this many objects.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Bucket name (omit to probe a local store directory).
    #[arg(long)]
    pub bucket: Option<String>,

    #[arg(long, default_value = "media")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ContentArgs {
    /// Catalog JSON produced by `generate`.
    #[arg(long)]
    pub books: PathBuf,

    /// Directory of extracted story texts (`<level>/<book id>.txt`).
    #[arg(long)]
    pub text_dir: PathBuf,

    /// Output path for the merged content JSON (updated after each book).
    #[arg(long)]
    pub out: PathBuf,

    /// Only process books in this level.
    #[arg(long)]
    pub level: Option<String>,

    /// Only process the book with this id.
    #[arg(long)]
    pub book_id: Option<String>,

    /// Stop after this many books (0 = no limit).
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}
