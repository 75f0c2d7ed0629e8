//! Identifiers.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Identifier of a synthesis run or a deployment.
/// Uses UUIDv7 for time-ordered, sortable IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new unique RunId using UUIDv7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Logical identifier of a stack, resource or output.
///
/// Must start with an ASCII letter and contain only ASCII letters, digits,
/// `-` and `_`. Stack ids become cloud stack names, so the alphabet matches
/// what the provider accepts.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display("{_0}")]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let mut chars = id.chars();
        let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_start || !valid_rest {
            return Err(Error::config(format!("invalid logical id '{}'", id)));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogicalId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

impl std::borrow::Borrow<str> for LogicalId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for LogicalId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LogicalId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_id_accepts_stack_names() {
        let id = LogicalId::new("ServerlessMlDbStack").unwrap();
        assert_eq!(id, "ServerlessMlDbStack");
        assert!(LogicalId::new("drift-rule_2").is_ok());
    }

    #[test]
    fn test_logical_id_rejects_bad_names() {
        assert!(matches!(LogicalId::new(""), Err(Error::Configuration(_))));
        assert!(LogicalId::new("1stack").is_err());
        assert!(LogicalId::new("db.host").is_err());
        assert!(LogicalId::new("has space").is_err());
    }

    #[test]
    fn test_logical_id_deserialize_validates() {
        let ok: LogicalId = serde_json::from_str("\"PredictFn\"").unwrap();
        assert_eq!(ok.as_str(), "PredictFn");
        assert!(serde_json::from_str::<LogicalId>("\"bad id\"").is_err());
    }
}
