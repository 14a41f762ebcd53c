//! Typed ID definitions.

use crate::{define_issued_id, define_minted_id, IdError};

// =============================================================================
// Minted by the scheduler
// =============================================================================

define_minted_id!(TaskId, "task");

// =============================================================================
// Issued by the resource manager
// =============================================================================

define_issued_id!(OfferId);
define_issued_id!(AgentId);
define_issued_id!(FrameworkId);
define_issued_id!(ExecutorId);

/// Validation shared by every string-backed ID.
#[doc(hidden)]
pub fn validate_opaque(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }

    if let Some(c) = s.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(IdError::InvalidFormat {
            message: format!("unexpected character {c:?}"),
        });
    }

    Ok(())
}

// =============================================================================
// Groups
// =============================================================================

/// Identifies a group of workers, keyed by the upstream endpoint they serve
/// (e.g. `http://search-a.internal:9200`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(String);

impl GroupKey {
    /// Parses a group key. Surrounding whitespace is trimmed.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let trimmed = s.trim();
        validate_opaque(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the upstream endpoint string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for GroupKey {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for GroupKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for GroupKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn task_id_roundtrip() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn task_id_rejects_wrong_prefix() {
        let id = TaskId::new();
        let s = id.to_string().replacen("task", "inst", 1);
        let err = TaskId::parse(&s).unwrap_err();
        assert!(err.is_prefix_error());
    }

    #[test]
    fn task_id_rejects_missing_separator() {
        assert_eq!(
            TaskId::parse("task01HV4Z2WQXKJNM8GPQY6VBKC3D"),
            Err(IdError::MissingSeparator)
        );
    }

    #[test]
    fn task_id_short_is_lowercase_tail() {
        let id = TaskId::parse("task_01HV4Z2WQXKJNM8GPQY6VBKC3D").unwrap();
        assert_eq!(id.short(), "y6vbkc3d");
    }

    #[test]
    fn issued_ids_are_opaque() {
        let offer = OfferId::parse("5f1c-O1234").unwrap();
        assert_eq!(offer.as_str(), "5f1c-O1234");
        assert!(OfferId::parse("").unwrap_err().is_empty());
        assert!(AgentId::parse("agent 1").is_err());
    }

    #[test]
    fn group_key_trims_whitespace() {
        let key = GroupKey::parse("  http://es:9200 ").unwrap();
        assert_eq!(key.as_str(), "http://es:9200");
    }

    #[test]
    fn serde_uses_plain_strings() {
        let offer = OfferId::parse("offer-1").unwrap();
        assert_eq!(serde_json::to_string(&offer).unwrap(), "\"offer-1\"");

        let group: GroupKey = serde_json::from_str("\"http://es:9200\"").unwrap();
        assert_eq!(group.as_str(), "http://es:9200");

        let bad: Result<FrameworkId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn task_id_parse_never_panics(s in ".*") {
            let _ = TaskId::parse(&s);
        }

        #[test]
        fn issued_id_roundtrips_visible_ascii(s in "[!-~]{1,64}") {
            let id = ExecutorId::parse(&s).unwrap();
            prop_assert_eq!(id.to_string(), s);
        }
    }
}
