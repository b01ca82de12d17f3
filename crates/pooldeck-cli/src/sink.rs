//! Export sink writing one JSON object per line.

use std::path::PathBuf;

use async_trait::async_trait;
use pooldeck_api_models::{ResourceKind, ResourceSummary};
use pooldeck_bulk::{ExportArtifact, ExportError, ExportSink};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writes exported rows to a `.jsonl` file, replacing any previous content.
pub(crate) struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub(crate) const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ExportSink for JsonLinesSink {
    async fn write(
        &self,
        kind: ResourceKind,
        rows: &[ResourceSummary],
    ) -> Result<ExportArtifact, ExportError> {
        let mut buffer = Vec::new();
        for row in rows {
            serde_json::to_writer(&mut buffer, row).map_err(|err| ExportError::Encode {
                id: row.id,
                message: err.to_string(),
            })?;
            buffer.push(b'\n');
        }

        let location = self.path.display().to_string();
        let write_failed = |source| ExportError::Write {
            location: location.clone(),
            source,
        };
        let mut file = fs::File::create(&self.path).await.map_err(write_failed)?;
        file.write_all(&buffer).await.map_err(write_failed)?;
        file.flush().await.map_err(write_failed)?;

        debug!(%kind, rows = rows.len(), path = %location, "export artifact written");
        Ok(ExportArtifact {
            location,
            rows: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::DateTime;
    use pooldeck_api_models::ResourceId;

    fn row(id: u64, key: &str) -> ResourceSummary {
        ResourceSummary {
            id: ResourceId(id),
            natural_key: key.to_string(),
            status: "active".to_string(),
            owner: Some("me".to_string()),
            usage_count: 1,
            tags: Vec::new(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn rows_are_written_one_per_line() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("proxies.jsonl");
        let sink = JsonLinesSink::new(path.clone());

        let artifact = sink
            .write(
                ResourceKind::Proxy,
                &[row(1, "10.0.0.1:8080"), row(2, "10.0.0.2:8080")],
            )
            .await?;

        assert_eq!(artifact.rows, 2);
        assert_eq!(artifact.location, path.display().to_string());
        let written = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: ResourceSummary = serde_json::from_str(lines[0])?;
        assert_eq!(first.natural_key, "10.0.0.1:8080");
        Ok(())
    }

    #[tokio::test]
    async fn unwritable_location_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("missing").join("out.jsonl");
        let sink = JsonLinesSink::new(path.clone());

        let err = sink
            .write(ResourceKind::EmailAccount, &[row(1, "a@example.com")])
            .await
            .expect_err("parent directory does not exist");

        match err {
            ExportError::Write { location, source } => {
                assert_eq!(location, path.display().to_string());
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected export error: {other}"),
        }
        Ok(())
    }
}
