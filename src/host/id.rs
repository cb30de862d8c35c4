//! Module identity parsing and validation
//!
//! Every module on a host is identified by a colon-delimited string whose
//! first token is the namespace (`plugin`, `command`, ...) and whose
//! remaining tokens form the name within that namespace.

use std::fmt;
use std::str::FromStr;

use crate::host::error::ValidationError;

/// Validated module identity. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Parse and validate a raw identity string.
    ///
    /// Valid identities contain at least two colon-delimited tokens with a
    /// non-empty first (namespace) token.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let tokens: Vec<&str> = raw.split(':').collect();

        if raw.is_empty() || tokens.len() < 2 || tokens[0].is_empty() {
            return Err(ValidationError::new(
                "module ID must be a colon-delimited string with a non-empty namespace as the first token",
                raw,
            ));
        }

        Ok(Self(raw.to_string()))
    }

    /// The first colon-delimited token.
    pub fn namespace(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    /// Everything after the first colon.
    pub fn name(&self) -> &str {
        self.0.split_once(':').map(|(_, rest)| rest).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form with the namespace rendered distinctly; cosmetic only.
    pub fn decorated(&self) -> String {
        format!("[{}] {}", self.namespace(), self.name())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_two_token_id() {
        let id = ModuleId::parse("plugin:core:logger").unwrap();
        assert_eq!(id.namespace(), "plugin");
        assert_eq!(id.name(), "core:logger");
        assert_eq!(id.as_str(), "plugin:core:logger");
    }

    #[test]
    fn test_missing_separator_rejected() {
        assert!(ModuleId::parse("plugin").is_err());
        assert!(ModuleId::parse("").is_err());
    }

    #[test]
    fn test_empty_namespace_rejected() {
        assert!(ModuleId::parse(":logger").is_err());
        assert!(ModuleId::parse(":core:logger").is_err());
    }

    #[test]
    fn test_decorated_form() {
        let id = ModuleId::parse("widget:order-book").unwrap();
        assert_eq!(id.decorated(), "[widget] order-book");
    }

    proptest! {
        #[test]
        fn test_strings_without_separator_always_rejected(s in "[^:]*") {
            prop_assert!(ModuleId::parse(&s).is_err());
        }

        #[test]
        fn test_namespaced_strings_always_accepted(
            ns in "[a-z][a-z0-9-]{0,8}",
            name in "[a-z0-9:-]{1,16}",
        ) {
            let raw = format!("{ns}:{name}");
            prop_assert!(ModuleId::parse(&raw).is_ok());
        }
    }
}
