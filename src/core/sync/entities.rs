//! Change-aware reconciliation of collection and biobank attributes
//!
//! The entity fetched from the Directory is kept as a snapshot; local values
//! are applied to a working copy; a write is issued only when the working
//! copy differs from the snapshot. Local values fill or replace remote ones
//! but never blank them out. List fields are compared as sets; both sides are
//! sorted and deduplicated first.

use crate::adapters::directory::{accepted, with_fallback, DirectoryApi};
use crate::core::sync::outcome::EntityChange;
use crate::domain::{BiobankAttributes, CollectionAttributes, CountryCode, Result};
use std::sync::Arc;

/// An entity local values can be applied to
pub trait Reconcilable: Clone + PartialEq {
    /// Apply the known values of `local` onto `self`
    fn apply_local(&mut self, local: &Self);

    /// Bring list fields into sorted, duplicate-free order
    fn canonicalize(&mut self);
}

fn fill<T: Clone>(remote: &mut Option<T>, local: &Option<T>) {
    if local.is_some() {
        remote.clone_from(local);
    }
}

fn fill_text(remote: &mut Option<String>, local: &Option<String>) {
    if let Some(value) = local {
        if !value.trim().is_empty() {
            *remote = Some(value.clone());
        }
    }
}

fn replace_list(remote: &mut Vec<String>, local: &[String]) {
    if !local.is_empty() {
        *remote = local.to_vec();
        canonical_list(remote);
    }
}

fn canonical_list(list: &mut Vec<String>) {
    list.sort();
    list.dedup();
}

impl Reconcilable for CollectionAttributes {
    fn apply_local(&mut self, local: &Self) {
        fill_text(&mut self.name, &local.name);
        fill_text(&mut self.description, &local.description);
        fill(&mut self.size, &local.size);
        fill(&mut self.order_of_magnitude, &local.order_of_magnitude);
        fill(&mut self.number_of_donors, &local.number_of_donors);
        fill(
            &mut self.order_of_magnitude_donors,
            &local.order_of_magnitude_donors,
        );
        fill(&mut self.age_low, &local.age_low);
        fill(&mut self.age_high, &local.age_high);
        replace_list(&mut self.sex, &local.sex);
        replace_list(&mut self.materials, &local.materials);
        replace_list(&mut self.storage_temperatures, &local.storage_temperatures);
        replace_list(&mut self.diagnosis_available, &local.diagnosis_available);
        replace_list(&mut self.networks, &local.networks);
        replace_list(&mut self.data_categories, &local.data_categories);
    }

    fn canonicalize(&mut self) {
        canonical_list(&mut self.sex);
        canonical_list(&mut self.materials);
        canonical_list(&mut self.storage_temperatures);
        canonical_list(&mut self.diagnosis_available);
        canonical_list(&mut self.networks);
        canonical_list(&mut self.data_categories);
    }
}

impl Reconcilable for BiobankAttributes {
    fn apply_local(&mut self, local: &Self) {
        fill_text(&mut self.name, &local.name);
        fill_text(&mut self.acronym, &local.acronym);
        fill_text(&mut self.description, &local.description);
        fill_text(&mut self.url, &local.url);
        fill_text(&mut self.juridical_person, &local.juridical_person);
        fill_text(&mut self.country, &local.country);
        fill_text(&mut self.contact, &local.contact);
        replace_list(&mut self.networks, &local.networks);
    }

    fn canonicalize(&mut self) {
        canonical_list(&mut self.networks);
    }
}

/// Remote snapshot paired with the working copy local values are applied to
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    snapshot: T,
    working: T,
}

impl<T: Reconcilable> Tracked<T> {
    pub fn new(mut remote: T) -> Self {
        remote.canonicalize();
        Self {
            working: remote.clone(),
            snapshot: remote,
        }
    }

    pub fn apply(&mut self, local: &T) {
        self.working.apply_local(local);
    }

    /// Whether the working copy differs from the snapshot
    pub fn is_changed(&self) -> bool {
        self.working != self.snapshot
    }

    pub fn snapshot(&self) -> &T {
        &self.snapshot
    }

    /// The working copy, if it must be written
    pub fn into_changed(self) -> Option<T> {
        if self.is_changed() {
            Some(self.working)
        } else {
            None
        }
    }
}

/// Remote entity updated with local values, or `None` when nothing changes
///
/// # Examples
///
/// ```
/// use directory_sync::core::sync::reconcile;
/// use directory_sync::domain::{CollectionAttributes, CollectionId};
///
/// let id = CollectionId::new("bbmri-eric:ID:DE_1:collection:a").unwrap();
/// let mut remote = CollectionAttributes::new(id.clone());
/// remote.size = Some(10);
///
/// let mut local = CollectionAttributes::new(id);
/// assert!(reconcile(&local, &remote).is_none());
///
/// local.size = Some(12);
/// assert_eq!(reconcile(&local, &remote).unwrap().size, Some(12));
/// ```
pub fn reconcile<T: Reconcilable>(local: &T, remote: &T) -> Option<T> {
    let mut tracked = Tracked::new(remote.clone());
    tracked.apply(local);
    tracked.into_changed()
}

/// Reads entities from the Directory and writes back the changed ones
pub struct EntityReconciler {
    directory: Arc<dyn DirectoryApi>,
    dry_run: bool,
}

impl EntityReconciler {
    pub fn new(directory: Arc<dyn DirectoryApi>, dry_run: bool) -> Self {
        Self { directory, dry_run }
    }

    /// Bring a collection up to date with its local profile
    ///
    /// # Errors
    ///
    /// Fails when the collection cannot be read or written on either endpoint.
    pub async fn reconcile_collection(
        &self,
        local: &CollectionAttributes,
        country: Option<&CountryCode>,
    ) -> Result<EntityChange> {
        let directory = &self.directory;
        let remote = with_fallback("get_collection", country, |endpoint| async move {
            directory.get_collection(&endpoint, &local.id).await
        })
        .await?;

        let Some(updated) = reconcile(local, &remote) else {
            tracing::debug!(collection_id = %local.id, "Collection unchanged");
            return Ok(EntityChange::Unchanged);
        };

        if self.dry_run {
            tracing::info!(collection_id = %local.id, "Dry run: collection would be updated");
            return Ok(EntityChange::WouldUpdate);
        }

        let updated = &updated;
        with_fallback("put_collection", country, |endpoint| async move {
            accepted(directory.put_collection(&endpoint, updated).await)
        })
        .await?;

        tracing::info!(collection_id = %local.id, "Collection updated");
        Ok(EntityChange::Updated)
    }

    /// Bring a biobank up to date with its configured attributes
    ///
    /// # Errors
    ///
    /// Fails when the biobank cannot be read or written on either endpoint.
    pub async fn reconcile_biobank(
        &self,
        local: &BiobankAttributes,
        country: Option<&CountryCode>,
    ) -> Result<EntityChange> {
        let directory = &self.directory;
        let remote = with_fallback("get_biobank", country, |endpoint| async move {
            directory.get_biobank(&endpoint, &local.id).await
        })
        .await?;

        let Some(updated) = reconcile(local, &remote) else {
            tracing::debug!(biobank_id = %local.id, "Biobank unchanged");
            return Ok(EntityChange::Unchanged);
        };

        if self.dry_run {
            tracing::info!(biobank_id = %local.id, "Dry run: biobank would be updated");
            return Ok(EntityChange::WouldUpdate);
        }

        let updated = &updated;
        with_fallback("put_biobank", country, |endpoint| async move {
            accepted(directory.put_biobank(&endpoint, updated).await)
        })
        .await?;

        tracing::info!(biobank_id = %local.id, "Biobank updated");
        Ok(EntityChange::Updated)
    }
}
