//! Canonical ICD-10 diagnosis codes in MIRIAM URI form

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// URI prefix of ICD-10 codes in the Directory vocabulary
pub const MIRIAM_ICD_PREFIX: &str = "urn:miriam:icd:";

/// Bare code used when a raw diagnosis cannot be interpreted (R69, "Illness, unspecified")
pub const UNSPECIFIED_ILLNESS_CODE: &str = "R69";

fn canonical_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z][0-9]{2}(\.[0-9]{1,2})?$").expect("canonical ICD-10 pattern is valid")
    })
}

/// Whether a bare code matches `LETTER DIGIT DIGIT [ . DIGIT{1,2} ]`
pub fn is_canonical_code(code: &str) -> bool {
    canonical_pattern().is_match(code)
}

/// Prefix a raw code with the MIRIAM namespace without touching anything else
///
/// Codes already carrying the prefix are returned unchanged.
pub fn to_miriam(raw: &str) -> String {
    if raw.starts_with(MIRIAM_ICD_PREFIX) {
        raw.to_string()
    } else {
        format!("{MIRIAM_ICD_PREFIX}{raw}")
    }
}

/// Drop the subcategory (everything from the first `.`) of a MIRIAM or bare code
pub fn parent_of(code: &str) -> String {
    match code.split_once('.') {
        Some((category, _)) => category.to_string(),
        None => code.to_string(),
    }
}

/// A validated ICD-10 code, always in `urn:miriam:icd:` form
///
/// # Examples
///
/// ```
/// use directory_sync::domain::diagnosis::DiagnosisCode;
///
/// let code = DiagnosisCode::parse("urn:miriam:icd:C18.0").unwrap();
/// assert_eq!(code.bare(), "C18.0");
/// assert_eq!(code.category().as_str(), "urn:miriam:icd:C18");
/// assert!(DiagnosisCode::parse("C1").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiagnosisCode(String);

impl DiagnosisCode {
    /// Parse a bare or MIRIAM-prefixed code; `None` unless it is canonical
    pub fn parse(code: &str) -> Option<Self> {
        let bare = code.strip_prefix(MIRIAM_ICD_PREFIX).unwrap_or(code);
        if is_canonical_code(bare) {
            Some(Self(format!("{MIRIAM_ICD_PREFIX}{bare}")))
        } else {
            None
        }
    }

    /// The fallback code for uninterpretable input
    pub fn unspecified() -> Self {
        Self(format!("{MIRIAM_ICD_PREFIX}{UNSPECIFIED_ILLNESS_CODE}"))
    }

    /// Full MIRIAM URI
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Code without the MIRIAM prefix
    pub fn bare(&self) -> &str {
        &self.0[MIRIAM_ICD_PREFIX.len()..]
    }

    /// Whether the code carries a subcategory
    pub fn has_subcategory(&self) -> bool {
        self.bare().contains('.')
    }

    /// The three-character ICD-10 category of this code
    pub fn category(&self) -> Self {
        Self(parent_of(&self.0))
    }

    /// Whether this is the fallback code
    pub fn is_unspecified(&self) -> bool {
        self.bare() == UNSPECIFIED_ILLNESS_CODE
    }
}

impl fmt::Display for DiagnosisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for DiagnosisCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("'{value}' is not a canonical ICD-10 code"))
    }
}

impl From<DiagnosisCode> for String {
    fn from(code: DiagnosisCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pattern() {
        assert!(is_canonical_code("C18"));
        assert!(is_canonical_code("C18.0"));
        assert!(is_canonical_code("C18.01"));
        assert!(!is_canonical_code("C18."));
        assert!(!is_canonical_code("C18.012"));
        assert!(!is_canonical_code("C1"));
        assert!(!is_canonical_code("c18"));
        assert!(!is_canonical_code("18.0"));
    }

    #[test]
    fn test_to_miriam() {
        assert_eq!(to_miriam("C18.0"), "urn:miriam:icd:C18.0");
        assert_eq!(to_miriam("urn:miriam:icd:C18.0"), "urn:miriam:icd:C18.0");
        assert_eq!(to_miriam(" c18 "), "urn:miriam:icd: c18 ");
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("urn:miriam:icd:C75.5"), "urn:miriam:icd:C75");
        assert_eq!(parent_of("C75"), "C75");
    }

    #[test]
    fn test_parse_and_category() {
        let code = DiagnosisCode::parse("C75.5").unwrap();
        assert_eq!(code.as_str(), "urn:miriam:icd:C75.5");
        assert!(code.has_subcategory());
        assert_eq!(code.category().bare(), "C75");
        assert!(!code.category().has_subcategory());
    }

    #[test]
    fn test_unspecified() {
        let code = DiagnosisCode::unspecified();
        assert_eq!(code.as_str(), "urn:miriam:icd:R69");
        assert!(code.is_unspecified());
        assert!(DiagnosisCode::parse(code.as_str()).is_some());
    }

    #[test]
    fn test_serde_rejects_non_canonical() {
        assert!(serde_json::from_str::<DiagnosisCode>("\"urn:miriam:icd:C18.0\"").is_ok());
        assert!(serde_json::from_str::<DiagnosisCode>("\"garbage\"").is_err());
    }
}
