use std::path::{Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::users::model::User;

pub const EXPORT_FILE_NAME: &str = "users.csv";

/// Column projection written for every record.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "_id")]
    id: Uuid,
    #[serde(rename = "firstName")]
    first_name: &'a str,
    #[serde(rename = "lastName")]
    last_name: &'a str,
    email: &'a str,
    mobile: &'a str,
    #[serde(rename = "createdAt")]
    created_at: String,
}

pub fn to_csv(users: &[User]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for u in users {
        wtr.serialize(CsvRow {
            id: u.id,
            first_name: &u.first_name,
            last_name: &u.last_name,
            email: &u.email,
            mobile: &u.mobile,
            created_at: u.created_at.format(&Rfc3339).context("format createdAt")?,
        })
        .context("serialize csv row")?;
    }
    wtr.into_inner().context("flush csv writer")
}

/// Deletes the export file once the response body that reads it is dropped.
struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            tracing::warn!(error = %e, path = %self.0.display(), "failed to remove csv export");
        }
    }
}

#[derive(Clone)]
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the CSV to a file private to this call and returns a byte stream
    /// over it. The file is removed when the stream is dropped.
    pub async fn export(
        &self,
        users: &[User],
    ) -> anyhow::Result<impl Stream<Item = std::io::Result<Bytes>> + Send + 'static> {
        let body = to_csv(users)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create export dir {}", self.dir.display()))?;
        let path = self.dir.join(format!("users-{}.csv", Uuid::new_v4()));
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write csv export {}", path.display()))?;
        let guard = RemoveOnDrop(path.clone());

        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("open csv export {}", path.display()))?;
        tracing::debug!(path = %path.display(), rows = users.len(), "csv export written");

        Ok(ReaderStream::new(file).map(move |chunk| {
            let _keep = &guard;
            chunk
        }))
    }
}
