//! Collection attributes derived from sample rows

use crate::core::diagnosis::{normalize, DiagnosisCorrectionMap};
use crate::domain::attributes::{order_of_magnitude, CollectionAttributes};
use crate::domain::dimensions::{material_type, Sex};
use crate::domain::{CollectionId, SampleRecord};
use std::collections::BTreeSet;

/// Compute what the Directory should know about a collection from its rows
///
/// Rows of other collections are ignored. With no rows at all every derived
/// field stays unknown, so nothing on the Directory side is overwritten.
/// Diagnoses are published only in corrected form.
pub fn collection_profile(
    collection_id: &CollectionId,
    rows: &[SampleRecord],
    corrections: &DiagnosisCorrectionMap,
) -> CollectionAttributes {
    let mut attrs = CollectionAttributes::new(collection_id.clone());
    let rows: Vec<&SampleRecord> = rows
        .iter()
        .filter(|row| &row.collection_id == collection_id)
        .collect();
    if rows.is_empty() {
        return attrs;
    }

    let size = rows.len() as u64;
    let donors = rows
        .iter()
        .map(|row| row.patient_id.as_str())
        .collect::<BTreeSet<_>>()
        .len() as u64;

    attrs.size = Some(size);
    attrs.order_of_magnitude = order_of_magnitude(size);
    attrs.number_of_donors = Some(donors);
    attrs.order_of_magnitude_donors = order_of_magnitude(donors);

    attrs.age_low = rows.iter().filter_map(|row| row.age_at_diagnosis).min();
    attrs.age_high = rows.iter().filter_map(|row| row.age_at_diagnosis).max();

    attrs.sex = rows
        .iter()
        .map(|row| Sex::from_record(row.sex.as_deref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|sex| sex.as_str().to_string())
        .collect();

    attrs.materials = rows
        .iter()
        .map(|row| material_type(&row.sample_material))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    attrs.diagnosis_available = rows
        .iter()
        .filter_map(|row| row.diagnosis())
        .filter_map(|raw| corrections.resolve(&normalize(raw)))
        .map(|code| code.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    attrs
}
