//! Vision service credential value object.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::domain::errors::AnalysisError;

/// API key for the remote vision service, masked in output and wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey {
    value: String,
}

impl ApiKey {
    /// Creates a key from a raw string.
    ///
    /// # Errors
    /// Returns `AnalysisError::Configuration` if the value is empty or blank.
    pub fn new(value: impl Into<String>) -> Result<Self, AnalysisError> {
        let mut raw = value.into();
        let value = raw.trim().to_string();
        raw.zeroize();

        if value.is_empty() {
            return Err(AnalysisError::configuration(
                "missing required credential GOOGLE_API_KEY",
            ));
        }

        Ok(Self { value })
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns masked key for display.
    #[must_use]
    pub fn masked(&self) -> String {
        if self.value.len() <= 10 {
            return "*".repeat(self.value.len());
        }

        let visible_prefix = &self.value[..4];
        let visible_suffix = &self.value[self.value.len() - 4..];
        format!("{visible_prefix}...{visible_suffix}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &self.masked())
            .finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "AIzaSyD-mock_api_key_1234567890";

    #[test]
    fn test_empty_key_is_configuration_error() {
        assert!(matches!(
            ApiKey::new(""),
            Err(AnalysisError::Configuration { .. })
        ));
        assert!(matches!(
            ApiKey::new("   "),
            Err(AnalysisError::Configuration { .. })
        ));
    }

    #[test]
    fn test_key_is_trimmed() {
        let key = ApiKey::new(format!("  {KEY}\n")).unwrap();
        assert_eq!(key.as_str(), KEY);
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = ApiKey::new(KEY).unwrap();
        let debug_output = format!("{key:?}");

        assert!(!debug_output.contains(KEY));
        assert!(key.masked().contains("..."));
    }
}
