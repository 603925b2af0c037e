//! Star model dimensions: sex, sample type and age range
//!
//! Maps clinical-store vocabulary onto the Directory's fixed dimension
//! vocabularies. Unknown inputs never fail; they land on the Directory's
//! catch-all value for the dimension.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Age range label used when the age is missing or outside every bracket
pub const UNKNOWN_AGE_RANGE: &str = "Unknown";

/// Directory sex vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Female,
    Male,
    Undifferential,
    Unknown,
}

impl Sex {
    /// Map a recorded administrative gender onto the Directory vocabulary
    pub fn from_record(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("female") | Some("f") => Sex::Female,
            Some("male") | Some("m") => Sex::Male,
            Some("other") | Some("undifferential") => Sex::Undifferential,
            _ => Sex::Unknown,
        }
    }

    /// Directory identifier of this value
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Female => "FEMALE",
            Sex::Male => "MALE",
            Sex::Undifferential => "UNDIFFERENTIAL",
            Sex::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a clinical material code onto a Directory material type
///
/// Accepts FHIR sample-material codes (`tissue-ffpe`, `blood-plasma`, ...)
/// as well as plain names (`TISSUE`, `plasma`). Anything unrecognised maps
/// to `OTHER`.
pub fn material_type(material: &str) -> &'static str {
    let normalized = material.trim().to_ascii_lowercase().replace(['_', ' '], "-");
    match normalized.as_str() {
        "tissue" | "tissue-ffpe" | "tumor-tissue-ffpe" | "normal-tissue-ffpe"
        | "other-tissue-ffpe" | "tissue-paraffin-embedded" => "TISSUE_PARAFFIN_EMBEDDED",
        "tissue-frozen" | "tumor-tissue-frozen" | "normal-tissue-frozen"
        | "other-tissue-frozen" => "TISSUE_FROZEN",
        "whole-blood" | "blood" => "WHOLE_BLOOD",
        "blood-plasma" | "plasma" | "plasma-edta" | "plasma-citrat" | "plasma-heparin"
        | "plasma-cell-free" | "plasma-other" => "PLASMA",
        "blood-serum" | "serum" => "SERUM",
        "buffy-coat" => "BUFFY_COAT",
        "peripheral-blood-cells" | "peripheral-blood-mononuclear-cells" | "pbmc" => {
            "PERIPHERAL_BLOOD_CELLS"
        }
        "dna" | "cf-dna" | "g-dna" => "DNA",
        "rna" => "RNA",
        "urine" => "URINE",
        "saliva" => "SALIVA",
        "feces" | "stool" => "FECES",
        "cell-line" | "cell-lines" => "CELL_LINES",
        _ => "OTHER",
    }
}

/// One row of the age bracket table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBracket {
    /// Directory age range label
    pub label: String,

    /// Inclusive lower bound in years
    pub min_years: u32,

    /// Inclusive upper bound in years; open-ended when absent
    #[serde(default)]
    pub max_years: Option<u32>,
}

impl AgeBracket {
    /// Create a bracket
    pub fn new(label: impl Into<String>, min_years: u32, max_years: Option<u32>) -> Self {
        Self {
            label: label.into(),
            min_years,
            max_years,
        }
    }

    /// Whether the age falls into this bracket
    pub fn contains(&self, age: u32) -> bool {
        age >= self.min_years && self.max_years.map_or(true, |max| age <= max)
    }
}

/// Default brackets following the Directory AgeRange ontology at year granularity
pub fn default_age_brackets() -> Vec<AgeBracket> {
    vec![
        AgeBracket::new("Infant", 0, Some(1)),
        AgeBracket::new("Child", 2, Some(12)),
        AgeBracket::new("Adolescent", 13, Some(17)),
        AgeBracket::new("Young Adult", 18, Some(24)),
        AgeBracket::new("Adult", 25, Some(44)),
        AgeBracket::new("Middle-aged", 45, Some(64)),
        AgeBracket::new("Aged (65-79 years)", 65, Some(79)),
        AgeBracket::new("Aged (>80 years)", 80, None),
    ]
}

/// Check a bracket table for overlaps and ordering
pub fn validate_age_brackets(brackets: &[AgeBracket]) -> Result<(), String> {
    if brackets.is_empty() {
        return Err("age bracket table cannot be empty".to_string());
    }

    for (i, bracket) in brackets.iter().enumerate() {
        if bracket.label.trim().is_empty() {
            return Err(format!("age bracket #{i} has an empty label"));
        }
        if let Some(max) = bracket.max_years {
            if max < bracket.min_years {
                return Err(format!(
                    "age bracket '{}' has max_years {} below min_years {}",
                    bracket.label, max, bracket.min_years
                ));
            }
        }
        if let Some(next) = brackets.get(i + 1) {
            match bracket.max_years {
                None => {
                    return Err(format!(
                        "open-ended age bracket '{}' must be the last one",
                        bracket.label
                    ))
                }
                Some(max) if next.min_years <= max => {
                    return Err(format!(
                        "age brackets '{}' and '{}' overlap",
                        bracket.label, next.label
                    ))
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}

/// Label of the bracket containing `age`, or [`UNKNOWN_AGE_RANGE`]
pub fn age_range_label(age: Option<u32>, brackets: &[AgeBracket]) -> String {
    age.and_then(|age| brackets.iter().find(|b| b.contains(age)))
        .map(|b| b.label.clone())
        .unwrap_or_else(|| UNKNOWN_AGE_RANGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sex_mapping() {
        assert_eq!(Sex::from_record(Some("female")), Sex::Female);
        assert_eq!(Sex::from_record(Some(" MALE ")), Sex::Male);
        assert_eq!(Sex::from_record(Some("other")), Sex::Undifferential);
        assert_eq!(Sex::from_record(Some("unknown")), Sex::Unknown);
        assert_eq!(Sex::from_record(None), Sex::Unknown);
        assert_eq!(Sex::Female.as_str(), "FEMALE");
    }

    #[test]
    fn test_material_mapping() {
        assert_eq!(material_type("TISSUE"), "TISSUE_PARAFFIN_EMBEDDED");
        assert_eq!(material_type("tumor-tissue-ffpe"), "TISSUE_PARAFFIN_EMBEDDED");
        assert_eq!(material_type("tissue-frozen"), "TISSUE_FROZEN");
        assert_eq!(material_type("whole-blood"), "WHOLE_BLOOD");
        assert_eq!(material_type("plasma_edta"), "PLASMA");
        assert_eq!(material_type("blood-serum"), "SERUM");
        assert_eq!(material_type("g-dna"), "DNA");
        assert_eq!(material_type("something-new"), "OTHER");
    }

    #[test]
    fn test_default_brackets_valid() {
        assert!(validate_age_brackets(&default_age_brackets()).is_ok());
    }

    #[test]
    fn test_age_range_label() {
        let brackets = default_age_brackets();
        assert_eq!(age_range_label(Some(35), &brackets), "Adult");
        assert_eq!(age_range_label(Some(0), &brackets), "Infant");
        assert_eq!(age_range_label(Some(17), &brackets), "Adolescent");
        assert_eq!(age_range_label(Some(64), &brackets), "Middle-aged");
        assert_eq!(age_range_label(Some(97), &brackets), "Aged (>80 years)");
        assert_eq!(age_range_label(None, &brackets), UNKNOWN_AGE_RANGE);
    }

    #[test]
    fn test_age_outside_table_is_unknown() {
        let brackets = vec![AgeBracket::new("Adult", 18, Some(64))];
        assert_eq!(age_range_label(Some(10), &brackets), UNKNOWN_AGE_RANGE);
        assert_eq!(age_range_label(Some(70), &brackets), UNKNOWN_AGE_RANGE);
    }

    #[test]
    fn test_validate_brackets_rejects_overlap() {
        let brackets = vec![
            AgeBracket::new("A", 0, Some(20)),
            AgeBracket::new("B", 20, None),
        ];
        assert!(validate_age_brackets(&brackets).is_err());
    }

    #[test]
    fn test_validate_brackets_rejects_open_ended_middle() {
        let brackets = vec![AgeBracket::new("A", 0, None), AgeBracket::new("B", 50, None)];
        assert!(validate_age_brackets(&brackets).is_err());
    }

    #[test]
    fn test_validate_brackets_rejects_inverted() {
        let brackets = vec![AgeBracket::new("A", 30, Some(10))];
        assert!(validate_age_brackets(&brackets).is_err());
    }
}
