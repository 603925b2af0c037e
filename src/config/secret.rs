//! Directory credentials held with the secrecy crate
//!
//! The API token is wrapped in [`SecretString`]: zeroized on drop, redacted
//! in `Debug` output and readable only through `expose_secret()`.
//!
//! ```rust
//! use directory_sync::config::{secret_string, SecretString};
//! use secrecy::ExposeSecret;
//!
//! let token: SecretString = secret_string("my-token".to_string());
//! assert_eq!(token.expose_secret().as_ref(), "my-token");
//! assert!(!format!("{token:?}").contains("my-token"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload of a secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A zeroizing, redacted string secret
pub type SecretString = Secret<SecretValue>;

/// Wrap a plain string
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// The token text when a non-blank token is configured
pub fn exposed_token(token: &Option<SecretString>) -> Option<&str> {
    token
        .as_ref()
        .map(|t| t.expose_secret())
        .filter(|value| !value.is_empty())
        .map(AsRef::as_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("test-token".to_string());
        assert_eq!(secret.expose_secret(), "test-token");
    }

    #[test]
    fn test_exposed_token() {
        assert_eq!(exposed_token(&Some(secret_string("abc".to_string()))), Some("abc"));
        assert_eq!(exposed_token(&Some(secret_string("  ".to_string()))), None);
        assert_eq!(exposed_token(&None), None);
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-data".to_string());
        let debug_output = format!("{secret:?}");

        assert!(!debug_output.contains("sensitive-data"));
        assert!(debug_output.contains("REDACTED") || debug_output.contains("Secret"));
    }

    #[test]
    fn test_secret_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Section {
            token: SecretString,
        }

        let section: Section = toml::from_str("token = \"t0ken\"").unwrap();
        assert_eq!(section.token.expose_secret(), "t0ken");
    }
}
