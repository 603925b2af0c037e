//! Check diagnosis command implementation
//!
//! Prints how raw diagnosis codes are normalized and, with `--resolve`, which
//! code the Directory would accept for them.

use crate::adapters::directory::{create_directory_client, DirectoryCodeValidator};
use crate::config::load_config;
use crate::core::diagnosis::{build_corrections, normalize_with_reason, DiagnosisCorrectionMap};
use clap::Args;

/// Arguments for the check-diagnosis command
#[derive(Args, Debug)]
pub struct CheckDiagnosisArgs {
    /// Raw diagnosis codes as recorded in the sample store
    #[arg(required = true, value_name = "CODE")]
    pub codes: Vec<String>,

    /// Ask the configured Directory which code it accepts
    #[arg(long)]
    pub resolve: bool,
}

impl CheckDiagnosisArgs {
    /// Execute the check-diagnosis command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(codes = self.codes.len(), "Checking diagnosis codes");

        let corrections = if self.resolve {
            match self.resolve_codes(config_path).await {
                Ok(map) => Some(map),
                Err(code) => return Ok(code),
            }
        } else {
            None
        };

        for raw in &self.codes {
            println!("{}", describe(raw, corrections.as_ref()));
        }

        Ok(0)
    }

    async fn resolve_codes(&self, config_path: &str) -> Result<DiagnosisCorrectionMap, i32> {
        let config = load_config(config_path).map_err(|e| {
            eprintln!("Failed to load configuration: {e}");
            2
        })?;

        let directory = create_directory_client(&config).map_err(|e| {
            eprintln!("Failed to initialize Directory client: {e}");
            4
        })?;

        let validator = DirectoryCodeValidator::new(directory, config.directory.country());
        build_corrections(&self.codes, &validator).await.map_err(|e| {
            tracing::error!(error = %e, "Diagnosis validation failed");
            eprintln!("Diagnosis validation failed: {e}");
            4
        })
    }
}

/// One report line for a raw code
fn describe(raw: &str, corrections: Option<&DiagnosisCorrectionMap>) -> String {
    let normalized = normalize_with_reason(raw);
    let mut line = match normalized.fallback {
        Some(reason) => format!("{raw:?} -> {} (fallback: {reason})", normalized.code),
        None => format!("{raw:?} -> {}", normalized.code),
    };

    if let Some(map) = corrections {
        match map.resolve(&normalized.code) {
            Some(accepted) => line.push_str(&format!(" => accepted as {accepted}")),
            None => line.push_str(" => not accepted; diagnosis dropped"),
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DiagnosisCode;

    #[test]
    fn test_describe_repaired_code() {
        assert_eq!(describe("c18,0", None), "\"c18,0\" -> urn:miriam:icd:C18.0");
    }

    #[test]
    fn test_describe_fallback() {
        let line = describe("unknown", None);
        assert!(line.contains("urn:miriam:icd:R69"));
        assert!(line.contains("fallback: no digits"));
    }

    #[test]
    fn test_describe_with_corrections() {
        let mut map = DiagnosisCorrectionMap::new();
        map.insert(
            DiagnosisCode::parse("C75.5").unwrap(),
            DiagnosisCode::parse("C75"),
        );

        let line = describe("C75.5", Some(&map));
        assert!(line.ends_with("=> accepted as urn:miriam:icd:C75"));

        let line = describe("C20", Some(&map));
        assert!(line.ends_with("not accepted; diagnosis dropped"));
    }
}
