//! Repair of malformed diagnosis codes
//!
//! Input is whatever the clinical store recorded: lower case, stray
//! punctuation, `,` or `-` as decimal separator, leading non-letters, missing
//! dots. Output is always a canonical [`DiagnosisCode`]; input that cannot be
//! interpreted becomes the R69 fallback and the reason is reported.

use crate::domain::diagnosis::{is_canonical_code, DiagnosisCode, MIRIAM_ICD_PREFIX};
use std::fmt;

/// Why a raw code fell back to the unspecified-illness code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FallbackReason {
    /// The input contains no digit at all
    NoDigits,
    /// No category letter precedes the digits
    MissingCategoryLetter,
    /// The category has fewer than two digits
    ShortCategory,
    /// The assembled code still fails the canonical pattern
    InvalidPattern,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FallbackReason::NoDigits => "no digits",
            FallbackReason::MissingCategoryLetter => "missing category letter",
            FallbackReason::ShortCategory => "category shorter than two digits",
            FallbackReason::InvalidPattern => "does not match the ICD-10 pattern",
        };
        f.write_str(text)
    }
}

/// Result of normalizing one raw code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub code: DiagnosisCode,
    /// Set when `code` is the fallback rather than a repaired input
    pub fallback: Option<FallbackReason>,
}

/// Normalize a raw diagnosis code, never failing
///
/// # Examples
///
/// ```
/// use directory_sync::core::diagnosis::normalize;
///
/// assert_eq!(normalize("c18,0").as_str(), "urn:miriam:icd:C18.0");
/// assert_eq!(normalize("C180").as_str(), "urn:miriam:icd:C18.0");
/// assert_eq!(normalize("not a code").as_str(), "urn:miriam:icd:R69");
/// ```
pub fn normalize(raw: &str) -> DiagnosisCode {
    normalize_with_reason(raw).code
}

/// Normalize a raw diagnosis code and report why a fallback was used
pub fn normalize_with_reason(raw: &str) -> Normalized {
    match repair(raw) {
        Ok(code) => Normalized {
            code,
            fallback: None,
        },
        Err(reason) => {
            tracing::debug!(raw = %raw, reason = %reason, "Diagnosis code fell back to R69");
            Normalized {
                code: DiagnosisCode::unspecified(),
                fallback: Some(reason),
            }
        }
    }
}

fn repair(raw: &str) -> Result<DiagnosisCode, FallbackReason> {
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return Err(FallbackReason::NoDigits);
    }

    let upper = raw.trim().to_ascii_uppercase();
    let without_prefix = upper
        .strip_prefix(&MIRIAM_ICD_PREFIX.to_ascii_uppercase())
        .unwrap_or(&upper);

    // Unify separators, then keep only letters, digits and dots
    let cleaned: Vec<char> = without_prefix
        .chars()
        .map(|c| if c == ',' || c == '-' { '.' } else { c })
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '.')
        .collect();

    let start = category_start(&cleaned).ok_or(FallbackReason::MissingCategoryLetter)?;
    let letter = cleaned[start];
    let rest = &cleaned[start + 1..];

    let digits: Vec<char> = rest.iter().take_while(|c| c.is_ascii_digit()).copied().collect();
    if digits.len() < 2 {
        return Err(FallbackReason::ShortCategory);
    }

    let category: String = digits[..2].iter().collect();
    let subcategory: String = if digits.len() > 2 {
        // Digits run on without a dot: C180 means C18.0
        digits[2..].iter().take(2).collect()
    } else {
        match rest.get(2) {
            Some('.') => rest[3..]
                .iter()
                .take_while(|c| c.is_ascii_digit())
                .take(2)
                .collect(),
            _ => String::new(),
        }
    };

    let code = if subcategory.is_empty() {
        format!("{letter}{category}")
    } else {
        format!("{letter}{category}.{subcategory}")
    };

    if !is_canonical_code(&code) {
        return Err(FallbackReason::InvalidPattern);
    }
    DiagnosisCode::parse(&code).ok_or(FallbackReason::InvalidPattern)
}

/// Position of the category letter: the first letter of the input
///
/// Anything before it is an unlabelled prefix and dropped. A letter prefix
/// such as `ICD10:` makes the category check fail, so the code falls back
/// instead of reading a diagnosis out of the prefix.
fn category_start(chars: &[char]) -> Option<usize> {
    chars.iter().position(|c| c.is_ascii_uppercase())
}
