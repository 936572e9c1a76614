//! Local media-tree scanning and bulk upload into object storage.
//!
//! The source tree is a pile of per-level directories with decorated
//! names; unknown directories are warned about and skipped, and a failed
//! upload never aborts the batch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cli::{CheckArgs, UploadArgs};
use crate::levels;
use crate::store::{GcsStore, LocalFsStore, ObjectStore};

#[derive(Debug, Clone)]
struct FileToUpload {
    local_path: PathBuf,
    key: String,
    content_type: &'static str,
}

pub fn open_store(bucket: &Option<String>, data_dir: &Path) -> Arc<dyn ObjectStore> {
    match bucket {
        Some(bucket) => {
            tracing::info!(bucket = %bucket, "using bucket store");
            Arc::new(GcsStore::new(bucket.clone()))
        }
        None => {
            tracing::info!(data_dir = %data_dir.display(), "using local store");
            Arc::new(LocalFsStore::new(data_dir))
        }
    }
}

/// Recursively collect files with the given extension (case-insensitive),
/// skipping hidden entries, in directory-traversal order.
pub fn collect_media_files(dir: &Path, ext: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("read dir: {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.metadata()?.is_dir() {
            files.extend(collect_media_files(&path, ext)?);
        } else if name.to_lowercase().ends_with(ext) {
            files.push(path);
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    Ok(path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", path.display()))?
        .to_string_lossy()
        .to_string())
}

fn collect_uploads(pdf_dir: &Path, audio_dir: &Path) -> anyhow::Result<Vec<FileToUpload>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(pdf_dir)
        .with_context(|| format!("read pdf tree: {}", pdf_dir.display()))?
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

        let pdfs = collect_media_files(&entry.path(), ".pdf")?;
        tracing::info!(level, count = pdfs.len(), "scanned pdf directory");
        for path in pdfs {
            let key = format!("pdf/{level}/{}", file_name(&path)?);
            files.push(FileToUpload {
                local_path: path,
                key,
                content_type: "application/pdf",
            });
        }
    }

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

        let mp3s = collect_media_files(&entry.path(), ".mp3")?;
        tracing::info!(level, count = mp3s.len(), "scanned audio directory");
        for path in mp3s {
            let key = format!("audio/{level}/{}", file_name(&path)?);
            files.push(FileToUpload {
                local_path: path,
                key,
                content_type: "audio/mpeg",
            });
        }
    }

    Ok(files)
}

pub async fn upload(args: UploadArgs) -> anyhow::Result<()> {
    let store = open_store(&args.bucket, &args.data_dir);

    let all_files = collect_uploads(&args.pdf_dir, &args.audio_dir)?;
    tracing::info!(total = all_files.len(), "collected media files");

    let existing: HashSet<String> = store
        .list("")
        .await
        .context("list existing objects")?
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    tracing::info!(existing = existing.len(), "listed uploaded objects");

    let pending: Vec<_> = all_files
        .into_iter()
        .filter(|file| !existing.contains(&file.key))
        .collect();
    if pending.is_empty() {
        tracing::info!("nothing to upload");
        return Ok(());
    }
    tracing::info!(pending = pending.len(), "uploading new files");

    let semaphore = Arc::new(Semaphore::new(args.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for file in pending {
        let store = Arc::clone(&store);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let result = async {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .context("acquire upload slot")?;
                upload_one(store.as_ref(), &file).await
            }
            .await;
            (file.key, result)
        });
    }

    let mut uploaded = 0usize;
    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (key, result) = joined.context("join upload task")?;
        match result {
            Ok(()) => {
                uploaded += 1;
                tracing::debug!(key = %key, "uploaded");
            }
            Err(err) => {
                failed += 1;
                tracing::error!(key = %key, error = %format!("{err:#}"), "upload failed");
            }
        }
    }

    tracing::info!(uploaded, failed, "upload finished");
    Ok(())
}

async fn upload_one(store: &dyn ObjectStore, file: &FileToUpload) -> anyhow::Result<()> {
    let body = tokio::fs::read(&file.local_path)
        .await
        .with_context(|| format!("read file: {}", file.local_path.display()))?;
    store.put(&file.key, body, file.content_type).await
}

/// List the first few stored objects under one level prefix.
pub async fn check(args: CheckArgs) -> anyhow::Result<()> {
    let store = open_store(&args.bucket, &args.data_dir);
    let prefix = format!("{}/{}/", args.kind.prefix(), args.level);

    let entries = store
        .list(&prefix)
        .await
        .with_context(|| format!("list {prefix}"))?;

    if entries.is_empty() {
        println!("no objects under {prefix}");
        return Ok(());
    }

    println!(
        "{} objects under {prefix} (showing first {}):",
        entries.len(),
        args.limit.min(entries.len())
    );
    for entry in entries.iter().take(args.limit) {
        println!("  - {} ({} bytes)", entry.key, entry.size);
    }
    Ok(())
}
