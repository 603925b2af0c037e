//! Negotiation of publishable diagnosis codes with the Directory vocabulary
//!
//! For every distinct raw code the corrector tries, in order, the code as
//! converted, the normalized code, the normalized code's category and the
//! converted code's category. The first candidate the Directory accepts wins.
//! Codes with no accepted candidate map to `None`, which drops the diagnosis
//! dimension for the affected facts.

use crate::core::diagnosis::normalizer::{normalize_with_reason, FallbackReason};
use crate::domain::diagnosis::{parent_of, to_miriam, DiagnosisCode};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Membership check against the Directory's diagnosis vocabulary
#[async_trait]
pub trait CodeValidator: Send + Sync {
    /// Whether the Directory knows `code` (MIRIAM form)
    ///
    /// An `Err` means the check itself could not be performed.
    async fn is_valid(&self, code: &str) -> Result<bool>;
}

/// Canonical code → publishable code, or `None` when nothing is publishable
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosisCorrectionMap {
    entries: BTreeMap<DiagnosisCode, Option<DiagnosisCode>>,
    fallbacks: BTreeMap<String, FallbackReason>,
}

impl DiagnosisCorrectionMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a correction; an existing entry for `code` is kept
    pub fn insert(&mut self, code: DiagnosisCode, corrected: Option<DiagnosisCode>) {
        self.entries.entry(code).or_insert(corrected);
    }

    /// Publishable code for `code`; `None` when unresolved or unknown
    pub fn resolve(&self, code: &DiagnosisCode) -> Option<&DiagnosisCode> {
        self.entries.get(code).and_then(Option::as_ref)
    }

    /// Raw map lookup distinguishing "unknown" from "known but unresolved"
    pub fn get(&self, code: &DiagnosisCode) -> Option<&Option<DiagnosisCode>> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &DiagnosisCode) -> bool {
        self.entries.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DiagnosisCode, &Option<DiagnosisCode>)> {
        self.entries.iter()
    }

    /// Codes for which no candidate was accepted
    pub fn unresolved(&self) -> impl Iterator<Item = &DiagnosisCode> {
        self.entries
            .iter()
            .filter(|(_, corrected)| corrected.is_none())
            .map(|(code, _)| code)
    }

    /// Raw codes that could not be repaired and fell back to R69
    pub fn normalization_fallbacks(&self) -> &BTreeMap<String, FallbackReason> {
        &self.fallbacks
    }
}

/// Build the correction map for a set of raw codes
///
/// Raw codes are deduplicated and processed in sorted order, so identical
/// input and a deterministic validator always produce the same map. Every
/// candidate is checked at most once. Validator errors abort the build.
///
/// Besides one entry per canonical code, the map holds an entry for each
/// code's ICD-10 category so generalized facts can be resolved as well.
pub async fn build_corrections<I, S>(
    raw_codes: I,
    validator: &dyn CodeValidator,
) -> Result<DiagnosisCorrectionMap>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let distinct: BTreeSet<String> = raw_codes
        .into_iter()
        .map(|code| code.as_ref().trim().to_string())
        .filter(|code| !code.is_empty())
        .collect();

    let mut checker = CachedValidator::new(validator);
    let mut map = DiagnosisCorrectionMap::new();

    for raw in &distinct {
        let normalized = normalize_with_reason(raw);
        if let Some(reason) = normalized.fallback {
            map.fallbacks.insert(raw.clone(), reason);
        }
        let canonical = normalized.code;

        if !map.contains(&canonical) {
            let corrected = correct(raw, &canonical, &mut checker).await?;
            match &corrected {
                Some(code) if code != &canonical => tracing::debug!(
                    raw = %raw,
                    corrected = %code,
                    "Diagnosis code corrected"
                ),
                Some(_) => {}
                None => tracing::warn!(
                    raw = %raw,
                    canonical = %canonical,
                    "No Directory diagnosis accepted; dimension will be dropped"
                ),
            }
            map.insert(canonical.clone(), corrected);
        }

        let category = canonical.category();
        if !map.contains(&category) {
            let corrected = checker.accept(category.as_str()).await?;
            map.insert(category, corrected);
        }
    }

    tracing::info!(
        raw_codes = distinct.len(),
        entries = map.len(),
        unresolved = map.unresolved().count(),
        fallbacks = map.fallbacks.len(),
        "Diagnosis correction map built"
    );

    Ok(map)
}

/// Walk the candidate chain for one raw code
async fn correct(
    raw: &str,
    canonical: &DiagnosisCode,
    checker: &mut CachedValidator<'_>,
) -> Result<Option<DiagnosisCode>> {
    let converted = to_miriam(raw);
    let candidates = [
        converted.clone(),
        canonical.as_str().to_string(),
        canonical.category().as_str().to_string(),
        parent_of(&converted),
    ];

    for candidate in candidates {
        if let Some(code) = checker.accept(&candidate).await? {
            return Ok(Some(code));
        }
    }
    Ok(None)
}

/// Validator wrapper remembering every answer for the duration of one build
struct CachedValidator<'a> {
    inner: &'a dyn CodeValidator,
    answers: HashMap<String, bool>,
}

impl<'a> CachedValidator<'a> {
    fn new(inner: &'a dyn CodeValidator) -> Self {
        Self {
            inner,
            answers: HashMap::new(),
        }
    }

    /// The candidate as a typed code when it is canonical and accepted
    ///
    /// Non-canonical candidates are never sent; the vocabulary only holds
    /// canonical codes and a non-canonical value could not be published.
    async fn accept(&mut self, candidate: &str) -> Result<Option<DiagnosisCode>> {
        let Some(code) = DiagnosisCode::parse(candidate) else {
            return Ok(None);
        };
        if code.as_str() != candidate {
            return Ok(None);
        }

        let valid = match self.answers.get(candidate) {
            Some(valid) => *valid,
            None => {
                let valid = self.inner.is_valid(candidate).await?;
                self.answers.insert(candidate.to_string(), valid);
                valid
            }
        };
        Ok(valid.then_some(code))
    }
}
