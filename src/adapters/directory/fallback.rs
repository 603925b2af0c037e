//! Dual-endpoint protocol
//!
//! Every Directory call is sent to the national node first. A refusal or an
//! error there is followed by the same call against the country-agnostic
//! endpoint; only when both fail is the operation reported as failed.

use crate::adapters::directory::traits::{DirectoryApi, DirectoryResult, Endpoint};
use crate::core::diagnosis::CodeValidator;
use crate::domain::{CountryCode, DirectoryError, Result};
use crate::log_fallback_attempt;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

const REFUSED: &str = "refused by Directory";

/// Run `call` against the country endpoint, then the global one
///
/// `call` returns `Ok(Some(_))` on success and `Ok(None)` when the Directory
/// refused the request. Without a country the global endpoint is used
/// directly.
///
/// # Errors
///
/// [`DirectoryError::BothEndpointsFailed`] carrying the reason of each side.
pub async fn with_fallback<T, F, Fut>(
    operation: &str,
    country: Option<&CountryCode>,
    mut call: F,
) -> DirectoryResult<T>
where
    F: FnMut(Endpoint) -> Fut,
    Fut: Future<Output = DirectoryResult<Option<T>>>,
{
    let country_reason = match country {
        Some(code) => {
            let reason = match call(Endpoint::Country(code.clone())).await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => REFUSED.to_string(),
                Err(e) => e.to_string(),
            };
            log_fallback_attempt!(operation, code, reason);
            reason
        }
        None => "no national node".to_string(),
    };

    let global_reason = match call(Endpoint::Global).await {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => REFUSED.to_string(),
        Err(e) => e.to_string(),
    };

    Err(DirectoryError::BothEndpointsFailed {
        operation: operation.to_string(),
        country: country_reason,
        global: global_reason,
    })
}

/// Adapts a boolean Directory answer to the shape [`with_fallback`] expects
pub fn accepted(result: DirectoryResult<bool>) -> DirectoryResult<Option<()>> {
    result.map(|ok| ok.then_some(()))
}

/// Diagnosis vocabulary check backed by the Directory
///
/// A code is valid when either endpoint knows it. The check fails only when
/// neither endpoint produced an answer.
pub struct DirectoryCodeValidator {
    directory: Arc<dyn DirectoryApi>,
    country: Option<CountryCode>,
}

impl DirectoryCodeValidator {
    pub fn new(directory: Arc<dyn DirectoryApi>, country: Option<CountryCode>) -> Self {
        Self { directory, country }
    }
}

#[async_trait]
impl CodeValidator for DirectoryCodeValidator {
    async fn is_valid(&self, code: &str) -> Result<bool> {
        let mut country_error = None;

        if let Some(country) = &self.country {
            let endpoint = Endpoint::Country(country.clone());
            match self.directory.validate_diagnosis(&endpoint, code).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    log_fallback_attempt!("validate_diagnosis", country, e);
                    country_error = Some(e.to_string());
                }
            }
        }

        match self.directory.validate_diagnosis(&Endpoint::Global, code).await {
            Ok(valid) => Ok(valid),
            Err(e) => match country_error {
                // the country endpoint answered, so its "no" stands
                None if self.country.is_some() => Ok(false),
                _ => Err(DirectoryError::BothEndpointsFailed {
                    operation: "validate_diagnosis".to_string(),
                    country: country_error.unwrap_or_else(|| "no national node".to_string()),
                    global: e.to_string(),
                }
                .into()),
            },
        }
    }
}
