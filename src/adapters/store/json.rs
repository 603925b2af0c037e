//! Sample store backed by a JSON document
//!
//! The document is an array of rows as produced by the extraction job:
//!
//! ```json
//! [
//!   {
//!     "collectionId": "bbmri-eric:ID:DE_1:collection:tumor",
//!     "sampleMaterial": "tissue-ffpe",
//!     "patientId": "p-0001",
//!     "sex": "female",
//!     "rawDiagnosisCode": "C18.0",
//!     "ageAtDiagnosis": 63
//!   }
//! ]
//! ```
//!
//! The file is read once per store instance; a failed read is retried on the
//! next call.

use super::traits::{DiagnosisScope, SampleStore};
use crate::config::StoreConfig;
use crate::domain::{CollectionId, Result, SampleRecord, StoreError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::OnceCell;

/// [`SampleStore`] reading pre-shaped rows from a JSON file
pub struct JsonSampleStore {
    path: PathBuf,
    timeout: Duration,
    rows: OnceCell<Vec<SampleRecord>>,
}

impl JsonSampleStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            timeout: Duration::from_secs(config.timeout_seconds),
            rows: OnceCell::new(),
        }
    }

    async fn rows(&self) -> Result<&[SampleRecord]> {
        let rows = self.rows.get_or_try_init(|| self.load()).await?;
        Ok(rows.as_slice())
    }

    async fn load(&self) -> Result<Vec<SampleRecord>> {
        let path_text = self.path.display().to_string();

        let bytes = tokio::time::timeout(self.timeout, tokio::fs::read(&self.path))
            .await
            .map_err(|_| StoreError::Timeout(format!("reading {path_text}")))?
            .map_err(|e| StoreError::Unavailable(format!("{path_text}: {e}")))?;

        let rows: Vec<SampleRecord> = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::InvalidData(format!("{path_text}: {e}")))?;

        tracing::info!(path = %path_text, rows = rows.len(), "Sample rows loaded");
        Ok(rows)
    }
}

#[async_trait]
impl SampleStore for JsonSampleStore {
    async fn test_connection(&self) -> Result<()> {
        self.rows().await.map(|_| ())
    }

    async fn list_collection_ids(&self) -> Result<Vec<CollectionId>> {
        let ids: BTreeSet<&CollectionId> =
            self.rows().await?.iter().map(|row| &row.collection_id).collect();
        Ok(ids.into_iter().cloned().collect())
    }

    async fn fetch_sample_records(&self, collection_id: &CollectionId) -> Result<Vec<SampleRecord>> {
        let rows: Vec<SampleRecord> = self
            .rows()
            .await?
            .iter()
            .filter(|row| &row.collection_id == collection_id)
            .cloned()
            .collect();
        tracing::debug!(collection_id = %collection_id, rows = rows.len(), "Fetched sample rows");
        Ok(rows)
    }

    async fn fetch_raw_diagnoses(&self, scope: &DiagnosisScope) -> Result<Vec<String>> {
        Ok(self
            .rows()
            .await?
            .iter()
            .filter(|row| scope.includes(&row.collection_id))
            .filter_map(|row| row.diagnosis().map(str::to_string))
            .collect())
    }
}
