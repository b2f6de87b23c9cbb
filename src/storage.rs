use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;

/// URL prefix under which stored files are served; `profile` values start with it.
pub const PUBLIC_PREFIX: &str = "uploads";

/// A single file taken from a record-mutating request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persists the file and returns its public path.
    async fn put(&self, file: UploadedFile) -> anyhow::Result<String>;
    /// Removes a file previously returned by `put`.
    async fn remove(&self, public_path: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path
            .strip_prefix(PUBLIC_PREFIX)?
            .strip_prefix('/')?;
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }
        Some(self.root.join(name))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, file: UploadedFile) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create upload dir {}", self.root.display()))?;

        let name = stored_name(
            file.file_name.as_deref(),
            file.content_type.as_deref(),
            OffsetDateTime::now_utc(),
        );
        let path = self.root.join(&name);
        tokio::fs::write(&path, &file.body)
            .await
            .with_context(|| format!("write upload {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = file.body.len(), "stored upload");
        Ok(format!("{}/{}", PUBLIC_PREFIX, name))
    }

    async fn remove(&self, public_path: &str) -> anyhow::Result<()> {
        let path = self
            .resolve(public_path)
            .with_context(|| format!("not an upload path: {}", public_path))?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove upload {}", path.display()))?;
        Ok(())
    }
}

/// `<unix millis>-<sanitized original name>`, with an extension from the
/// content type when the original name has none.
fn stored_name(original: Option<&str>, content_type: Option<&str>, now: OffsetDateTime) -> String {
    lazy_static! {
        static ref UNSAFE: Regex = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
    }
    let millis = now.unix_timestamp_nanos() / 1_000_000;

    let base = original
        .and_then(|n| n.rsplit(['/', '\\']).next())
        .map(|n| UNSAFE.replace_all(n, "_").trim_matches('.').to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "profile".to_string());

    if base.contains('.') {
        return format!("{}-{}", millis, base);
    }
    let ext = content_type.and_then(ext_from_mime).unwrap_or("bin");
    format!("{}-{}.{}", millis, base, ext)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod upload_tests {
    use super::*;

    fn at(ms: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000).unwrap()
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn stored_name_sanitizes_original() {
        assert_eq!(
            stored_name(Some("../me & you.PNG"), None, at(1700)),
            "1700-me_you.PNG"
        );
        assert_eq!(
            stored_name(Some(r"C:\photos\avatar.jpg"), None, at(1)),
            "1-avatar.jpg"
        );
    }

    #[test]
    fn stored_name_falls_back_to_content_type() {
        assert_eq!(
            stored_name(None, Some("image/webp"), at(42)),
            "42-profile.webp"
        );
        assert_eq!(stored_name(Some("avatar"), None, at(42)), "42-avatar.bin");
    }

    #[tokio::test]
    async fn put_then_remove() {
        let root = std::env::temp_dir().join(format!("usersdesk-up-{}", uuid::Uuid::new_v4()));
        let store = LocalFileStore::new(&root);
        let public = store
            .put(UploadedFile {
                file_name: Some("a.png".into()),
                content_type: Some("image/png".into()),
                body: Bytes::from_static(b"png"),
            })
            .await
            .unwrap();
        assert!(public.starts_with("uploads/"));
        let on_disk = store.resolve(&public).unwrap();
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"png");

        store.remove(&public).await.unwrap();
        assert!(!on_disk.exists());
        assert!(store.remove("elsewhere/../../etc/passwd").await.is_err());
        assert!(store.resolve("uploadsfoo.png").is_none());
        assert!(store.resolve("uploads//a.png").is_none());
        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
