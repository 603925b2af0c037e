//! Fact table replacement
//!
//! A collection's facts are replaced as a whole: list every fact the Directory
//! holds for it, delete them, insert the new set. Each request goes to the
//! national node first and to the global endpoint when refused.

use crate::adapters::directory::{accepted, with_fallback, DirectoryApi, DirectoryResult, Endpoint};
use crate::core::sync::outcome::ReplaceReport;
use crate::domain::{CollectionId, CountryCode, Fact, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Replaces the facts of one collection at a time
pub struct FactSynchronizer {
    directory: Arc<dyn DirectoryApi>,
    batch_size: usize,
    dry_run: bool,
}

impl FactSynchronizer {
    pub fn new(directory: Arc<dyn DirectoryApi>, batch_size: usize, dry_run: bool) -> Self {
        Self {
            directory,
            batch_size: batch_size.max(1),
            dry_run,
        }
    }

    /// Replace the Directory's facts of `collection_id` with `facts`
    ///
    /// An empty `facts` slice removes every existing fact. In a dry run the
    /// existing facts are listed but nothing is deleted or inserted.
    ///
    /// # Errors
    ///
    /// Fails when a phase was refused by both endpoints. Deleted facts are
    /// not restored.
    pub async fn replace_facts(
        &self,
        collection_id: &CollectionId,
        country: Option<&CountryCode>,
        facts: &[Fact],
    ) -> Result<ReplaceReport> {
        let existing = with_fallback("list_fact_ids", country, |endpoint| async move {
            self.list_all(&endpoint, collection_id).await.map(Some)
        })
        .await?;

        tracing::debug!(
            collection_id = %collection_id,
            existing = existing.len(),
            new = facts.len(),
            "Replacing facts"
        );

        if self.dry_run {
            tracing::info!(
                collection_id = %collection_id,
                would_delete = existing.len(),
                would_insert = facts.len(),
                "Dry run: facts not replaced"
            );
            return Ok(ReplaceReport {
                existing: existing.len(),
                deleted: existing.len(),
                inserted: facts.len(),
                dry_run: true,
            });
        }

        for batch in existing.chunks(self.batch_size) {
            with_fallback("delete_facts", country, |endpoint| async move {
                accepted(self.directory.delete_facts(&endpoint, batch).await)
            })
            .await?;
        }

        for batch in facts.chunks(self.batch_size) {
            with_fallback("insert_facts", country, |endpoint| async move {
                accepted(self.directory.insert_facts(&endpoint, batch).await)
            })
            .await?;
        }

        tracing::info!(
            collection_id = %collection_id,
            deleted = existing.len(),
            inserted = facts.len(),
            "Facts replaced"
        );

        Ok(ReplaceReport {
            existing: existing.len(),
            deleted: existing.len(),
            inserted: facts.len(),
            dry_run: false,
        })
    }

    /// Every fact ID of a collection on one endpoint
    ///
    /// Listing ends on the first empty page, or on a page that brings no new
    /// ID (a server ignoring the offset would otherwise never end).
    async fn list_all(
        &self,
        endpoint: &Endpoint,
        collection_id: &CollectionId,
    ) -> DirectoryResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for page in 0.. {
            let batch = self
                .directory
                .list_fact_ids(endpoint, collection_id, page)
                .await?;
            if batch.is_empty() {
                break;
            }

            let before = ids.len();
            for id in batch {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
            if ids.len() == before {
                tracing::warn!(
                    collection_id = %collection_id,
                    endpoint = %endpoint,
                    page = page,
                    "Fact listing repeated a page; stopping"
                );
                break;
            }
        }

        Ok(ids)
    }
}
