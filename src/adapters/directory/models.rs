//! Directory entity documents
//!
//! Both Directory flavours carry the same entities with different field names
//! and different encodings of references. A [`Layout`] captures those
//! differences so the mapping to [`CollectionAttributes`] and
//! [`BiobankAttributes`] is written once.
//!
//! Reading is tolerant: a reference may arrive as a plain string, a number or
//! an object carrying `id` or `name`.
//!
//! Both APIs update whole rows, so every field of the fetched document that
//! is not modelled is kept in `unmodeled` and written back with the row.
//! Molgenis metadata (`_href`, `_meta`, ...) is dropped.

use crate::domain::{
    BiobankAttributes, BiobankId, CollectionAttributes, CollectionId, DirectoryError, Fact,
};
use serde_json::{json, Map, Value};

/// Field names and reference encoding of one Directory flavour
pub(crate) struct Layout {
    pub order_of_magnitude: &'static str,
    pub number_of_donors: &'static str,
    pub order_of_magnitude_donors: &'static str,
    pub age_low: &'static str,
    pub age_high: &'static str,
    pub storage_temperatures: &'static str,
    pub diagnosis_available: &'static str,
    pub networks: &'static str,
    pub data_categories: &'static str,
    pub juridical_person: &'static str,
    pub age_range: &'static str,
    pub sample_type: &'static str,
    pub number_of_samples: &'static str,
    pub national_node: &'static str,
    /// Encoding of a reference to an ontology term
    pub ontology_ref: fn(&str) -> Value,
    /// Encoding of a reference to another entity
    pub entity_ref: fn(&str) -> Value,
    /// Turn a fetched value into its write encoding
    pub write_value: fn(&Value) -> Value,
}

/// Molgenis REST v2 tables
pub(crate) const REST: Layout = Layout {
    order_of_magnitude: "order_of_magnitude",
    number_of_donors: "number_of_donors",
    order_of_magnitude_donors: "order_of_magnitude_donors",
    age_low: "age_low",
    age_high: "age_high",
    storage_temperatures: "storage_temperatures",
    diagnosis_available: "diagnosis_available",
    networks: "network",
    data_categories: "data_categories",
    juridical_person: "juridical_person",
    age_range: "age_range",
    sample_type: "sample_type",
    number_of_samples: "number_of_samples",
    national_node: "national_node",
    ontology_ref: plain_ref,
    entity_ref: plain_ref,
    write_value: flatten_references,
};

/// EMX2 GraphQL schema
pub(crate) const GRAPHQL: Layout = Layout {
    order_of_magnitude: "orderOfMagnitude",
    number_of_donors: "numberOfDonors",
    order_of_magnitude_donors: "orderOfMagnitudeDonors",
    age_low: "ageLow",
    age_high: "ageHigh",
    storage_temperatures: "storageTemperatures",
    diagnosis_available: "diagnosisAvailable",
    networks: "networks",
    data_categories: "dataCategories",
    juridical_person: "juridicalPerson",
    age_range: "ageRange",
    sample_type: "sampleType",
    number_of_samples: "numberOfSamples",
    national_node: "nationalNode",
    ontology_ref: name_ref,
    entity_ref: id_ref,
    write_value: Value::clone,
};

fn plain_ref(value: &str) -> Value {
    Value::String(value.to_string())
}

fn name_ref(value: &str) -> Value {
    json!({ "name": value })
}

fn id_ref(value: &str) -> Value {
    json!({ "id": value })
}

/// Expanded references (`{"_href": .., "id": ..}`) become plain IDs
fn flatten_references(value: &Value) -> Value {
    match value {
        Value::Object(obj) => obj
            .get("id")
            .or_else(|| obj.get("name"))
            .and_then(reference_value)
            .map(Value::String)
            .unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(flatten_references).collect()),
        other => other.clone(),
    }
}

fn text(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integer(doc: &Value, field: &str) -> Option<u64> {
    match doc.get(field)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn reference_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => obj
            .get("id")
            .or_else(|| obj.get("name"))
            .and_then(reference_value),
        _ => None,
    }
}

fn reference(doc: &Value, field: &str) -> Option<String> {
    doc.get(field).and_then(reference_value)
}

fn references(doc: &Value, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(reference_value).collect(),
        Some(single) => reference_value(single).into_iter().collect(),
        None => Vec::new(),
    }
}

fn put_opt(doc: &mut Map<String, Value>, field: &str, value: Option<Value>) {
    if let Some(value) = value {
        doc.insert(field.to_string(), value);
    }
}

fn put_list(doc: &mut Map<String, Value>, field: &str, values: &[String], encode: fn(&str) -> Value) {
    doc.insert(
        field.to_string(),
        Value::Array(values.iter().map(|v| encode(v)).collect()),
    );
}

impl Layout {
    fn collection_fields(&self) -> [&'static str; 15] {
        [
            "id",
            "name",
            "description",
            "size",
            self.order_of_magnitude,
            self.number_of_donors,
            self.order_of_magnitude_donors,
            self.age_low,
            self.age_high,
            "sex",
            "materials",
            self.storage_temperatures,
            self.diagnosis_available,
            self.networks,
            self.data_categories,
        ]
    }

    fn biobank_fields(&self) -> [&'static str; 9] {
        [
            "id",
            "name",
            "acronym",
            "description",
            "url",
            self.juridical_person,
            "country",
            "contact",
            self.networks,
        ]
    }

    /// Fields of `doc` outside `modeled`, in write encoding
    fn unmodeled(&self, doc: &Value, modeled: &[&str]) -> Map<String, Value> {
        let Some(fields) = doc.as_object() else {
            return Map::new();
        };
        fields
            .iter()
            .filter(|(key, value)| {
                !key.starts_with('_') && !value.is_null() && !modeled.contains(&key.as_str())
            })
            .map(|(key, value)| (key.clone(), (self.write_value)(value)))
            .collect()
    }

    /// Decode a collection document
    pub fn collection_from(&self, doc: &Value) -> Result<CollectionAttributes, DirectoryError> {
        let id = text(doc, "id")
            .ok_or_else(|| DirectoryError::InvalidResponse("collection without id".to_string()))?;
        let id = CollectionId::new(id).map_err(DirectoryError::InvalidResponse)?;

        let mut attrs = CollectionAttributes::new(id);
        attrs.name = text(doc, "name");
        attrs.description = text(doc, "description");
        attrs.size = integer(doc, "size");
        attrs.order_of_magnitude =
            reference(doc, self.order_of_magnitude).and_then(|v| v.parse().ok());
        attrs.number_of_donors = integer(doc, self.number_of_donors);
        attrs.order_of_magnitude_donors =
            reference(doc, self.order_of_magnitude_donors).and_then(|v| v.parse().ok());
        attrs.age_low = integer(doc, self.age_low).and_then(|v| u32::try_from(v).ok());
        attrs.age_high = integer(doc, self.age_high).and_then(|v| u32::try_from(v).ok());
        attrs.sex = references(doc, "sex");
        attrs.materials = references(doc, "materials");
        attrs.storage_temperatures = references(doc, self.storage_temperatures);
        attrs.diagnosis_available = references(doc, self.diagnosis_available);
        attrs.networks = references(doc, self.networks);
        attrs.data_categories = references(doc, self.data_categories);
        attrs.unmodeled = self.unmodeled(doc, &self.collection_fields());
        Ok(attrs)
    }

    /// Encode a collection document
    pub fn collection_to(&self, attrs: &CollectionAttributes) -> Value {
        let mut doc = attrs.unmodeled.clone();
        doc.insert("id".to_string(), json!(attrs.id.as_str()));
        put_opt(&mut doc, "name", attrs.name.as_ref().map(|v| json!(v)));
        put_opt(&mut doc, "description", attrs.description.as_ref().map(|v| json!(v)));
        put_opt(&mut doc, "size", attrs.size.map(|v| json!(v)));
        put_opt(
            &mut doc,
            self.order_of_magnitude,
            attrs
                .order_of_magnitude
                .map(|v| (self.ontology_ref)(&v.to_string())),
        );
        put_opt(&mut doc, self.number_of_donors, attrs.number_of_donors.map(|v| json!(v)));
        put_opt(
            &mut doc,
            self.order_of_magnitude_donors,
            attrs
                .order_of_magnitude_donors
                .map(|v| (self.ontology_ref)(&v.to_string())),
        );
        put_opt(&mut doc, self.age_low, attrs.age_low.map(|v| json!(v)));
        put_opt(&mut doc, self.age_high, attrs.age_high.map(|v| json!(v)));
        put_list(&mut doc, "sex", &attrs.sex, self.ontology_ref);
        put_list(&mut doc, "materials", &attrs.materials, self.ontology_ref);
        put_list(
            &mut doc,
            self.storage_temperatures,
            &attrs.storage_temperatures,
            self.ontology_ref,
        );
        put_list(
            &mut doc,
            self.diagnosis_available,
            &attrs.diagnosis_available,
            self.ontology_ref,
        );
        put_list(&mut doc, self.networks, &attrs.networks, self.entity_ref);
        put_list(
            &mut doc,
            self.data_categories,
            &attrs.data_categories,
            self.ontology_ref,
        );
        Value::Object(doc)
    }

    /// Decode a biobank document
    pub fn biobank_from(&self, doc: &Value) -> Result<BiobankAttributes, DirectoryError> {
        let id = text(doc, "id")
            .ok_or_else(|| DirectoryError::InvalidResponse("biobank without id".to_string()))?;
        let id = BiobankId::new(id).map_err(DirectoryError::InvalidResponse)?;

        let mut attrs = BiobankAttributes::new(id);
        attrs.name = text(doc, "name");
        attrs.acronym = text(doc, "acronym");
        attrs.description = text(doc, "description");
        attrs.url = text(doc, "url");
        attrs.juridical_person = text(doc, self.juridical_person);
        attrs.country = reference(doc, "country");
        attrs.contact = reference(doc, "contact");
        attrs.networks = references(doc, self.networks);
        attrs.unmodeled = self.unmodeled(doc, &self.biobank_fields());
        Ok(attrs)
    }

    /// Encode a biobank document
    pub fn biobank_to(&self, attrs: &BiobankAttributes) -> Value {
        let mut doc = attrs.unmodeled.clone();
        doc.insert("id".to_string(), json!(attrs.id.as_str()));
        put_opt(&mut doc, "name", attrs.name.as_ref().map(|v| json!(v)));
        put_opt(&mut doc, "acronym", attrs.acronym.as_ref().map(|v| json!(v)));
        put_opt(&mut doc, "description", attrs.description.as_ref().map(|v| json!(v)));
        put_opt(&mut doc, "url", attrs.url.as_ref().map(|v| json!(v)));
        put_opt(
            &mut doc,
            self.juridical_person,
            attrs.juridical_person.as_ref().map(|v| json!(v)),
        );
        put_opt(
            &mut doc,
            "country",
            attrs.country.as_deref().map(self.ontology_ref),
        );
        put_opt(&mut doc, "contact", attrs.contact.as_deref().map(self.entity_ref));
        put_list(&mut doc, self.networks, &attrs.networks, self.entity_ref);
        Value::Object(doc)
    }

    /// Encode a fact row
    pub fn fact_to(&self, fact: &Fact) -> Value {
        let mut doc = Map::new();
        doc.insert("id".to_string(), json!(fact.id));
        doc.insert(
            "collection".to_string(),
            (self.entity_ref)(fact.collection.as_str()),
        );
        doc.insert("sex".to_string(), (self.ontology_ref)(fact.sex.as_str()));
        put_opt(
            &mut doc,
            "disease",
            fact.disease
                .as_ref()
                .map(|code| (self.ontology_ref)(code.as_str())),
        );
        doc.insert(
            self.age_range.to_string(),
            (self.ontology_ref)(&fact.age_range),
        );
        doc.insert(
            self.sample_type.to_string(),
            (self.ontology_ref)(&fact.sample_type),
        );
        doc.insert(self.number_of_donors.to_string(), json!(fact.number_of_donors));
        doc.insert(
            self.number_of_samples.to_string(),
            json!(fact.number_of_samples),
        );
        doc.insert(
            self.national_node.to_string(),
            (self.entity_ref)(&fact.national_node),
        );
        Value::Object(doc)
    }
}
