use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;

/// One listed object.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// Flat key/value object storage with `pdf/<level>/<file>` and
/// `audio/<level>/<file>` keys.
///
/// `list` must fully paginate before returning: the catalog core pairs
/// files across two listings, and a partial listing would make pairings
/// depend on pagination boundaries.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<ObjectEntry>>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()>;
}

/// Local directory laid out exactly like the bucket. Used for development
/// and for serving a media tree that never left the machine.
#[derive(Debug, Clone)]
pub struct LocalFsStore {
    base_dir: PathBuf,
}

impl LocalFsStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn key_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let mut path = self.base_dir.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            if segment == ".." {
                anyhow::bail!("object key must not contain '..': {key}");
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<ObjectEntry>> {
        let root = self.key_path(prefix.trim_end_matches('/'))?;
        let prefix = prefix.trim_end_matches('/').to_owned();
        tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            if root.is_dir() {
                walk_dir(&root, &prefix, &mut entries)?;
            }
            Ok(entries)
        })
        .await
        .context("join list task")?
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.key_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read object: {}", path.display())),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> anyhow::Result<()> {
        let path = self.key_path(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("object key has no parent: {key}"))?;
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create object dir: {}", parent.display()))?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("write object: {}", path.display()))?;
        Ok(())
    }
}

/// Keys in directory-traversal order, as delivered by the filesystem.
/// Deliberately not sorted: listing order is the tie-break the catalog
/// core documents.
fn walk_dir(dir: &Path, prefix: &str, entries: &mut Vec<ObjectEntry>) -> anyhow::Result<()> {
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("read dir: {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path();
        let meta = entry.metadata()?;
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if meta.is_dir() {
            walk_dir(&path, &key, entries)?;
        } else {
            entries.push(ObjectEntry {
                key,
                size: meta.len(),
            });
        }
    }
    Ok(())
}

/// Cloud bucket over the storage JSON/XML endpoints, authenticated with a
/// bearer token — `RAZSHELF_GCS_TOKEN` when set, otherwise the instance
/// metadata server.
#[derive(Debug, Clone)]
pub struct GcsStore {
    bucket: String,
    client: reqwest::Client,
}

impl GcsStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn access_token(&self) -> anyhow::Result<String> {
        if let Ok(token) = std::env::var("RAZSHELF_GCS_TOKEN") {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_owned());
            }
        }

        #[derive(Debug, serde::Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let url = "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
        let resp = self
            .client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .context("request metadata access token")?;
        if !resp.status().is_success() {
            anyhow::bail!("metadata token request failed ({})", resp.status());
        }
        let token: TokenResponse = resp.json().await.context("parse metadata token json")?;
        Ok(token.access_token)
    }

    fn object_url(&self, key: &str) -> anyhow::Result<reqwest::Url> {
        // Url parsing percent-encodes spaces and non-ASCII filename
        // characters for us.
        reqwest::Url::parse(&format!("https://storage.googleapis.com/{}/{key}", self.bucket))
            .with_context(|| format!("build object url for key: {key}"))
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<ObjectEntry>> {
        #[derive(Debug, serde::Deserialize)]
        struct ListResponse {
            #[serde(default)]
            items: Vec<ListItem>,
            #[serde(rename = "nextPageToken")]
            next_page_token: Option<String>,
        }

        #[derive(Debug, serde::Deserialize)]
        struct ListItem {
            name: String,
            // The JSON API returns sizes as decimal strings.
            #[serde(default)]
            size: Option<String>,
        }

        let token = self.access_token().await?;
        let url = format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o",
            self.bucket
        );

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .query(&[("prefix", prefix)]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let resp = request.send().await.context("list bucket objects")?;
            if !resp.status().is_success() {
                anyhow::bail!("bucket list failed ({})", resp.status());
            }
            let page: ListResponse = resp.json().await.context("parse bucket listing")?;

            for item in page.items {
                let size = item
                    .size
                    .as_deref()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(0);
                entries.push(ObjectEntry {
                    key: item.name,
                    size,
                });
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(entries)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .get(self.object_url(key)?)
            .bearer_auth(&token)
            .send()
            .await
            .with_context(|| format!("fetch object: {key}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("object fetch failed ({}): {key}", resp.status());
        }

        let body = resp.bytes().await.context("read object body")?;
        Ok(Some(body.to_vec()))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> anyhow::Result<()> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .put(self.object_url(key)?)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .with_context(|| format!("upload object: {key}"))?;

        if !resp.status().is_success() {
            anyhow::bail!("object upload failed ({}): {key}", resp.status());
        }
        Ok(())
    }
}

/// Strip the `pdf/<level>/` style prefix off a listed key, leaving the
/// bare filename the catalog core works with.
pub fn file_name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_round_trips_and_lists() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let store = LocalFsStore::new(temp.path());

        store
            .put("pdf/A/1-Zoo.pdf", b"pdf-bytes".to_vec(), "application/pdf")
            .await?;
        store
            .put("audio/A/1-Zoo.mp3", b"mp3-bytes".to_vec(), "audio/mpeg")
            .await?;

        let got = store.get("pdf/A/1-Zoo.pdf").await?;
        assert_eq!(got.as_deref(), Some(b"pdf-bytes".as_slice()));
        assert_eq!(store.get("pdf/A/missing.pdf").await?, None);

        let listed = store.list("pdf/A/").await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "pdf/A/1-Zoo.pdf");
        assert_eq!(listed[0].size, 9);

        // Unknown prefix is an empty listing, not an error.
        assert!(store.list("pdf/ZZ/").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn local_store_rejects_traversal_keys() {
        let store = LocalFsStore::new("/tmp/razshelf-test");
        assert!(store.get("pdf/../../etc/passwd").await.is_err());
    }

    #[test]
    fn file_name_of_strips_prefixes() {
        assert_eq!(file_name_of("pdf/A/1-Zoo.pdf"), "1-Zoo.pdf");
        assert_eq!(file_name_of("bare.mp3"), "bare.mp3");
    }
}
