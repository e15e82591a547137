use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a preset, or the target of a reference.
///
/// Identities only live in memory. The exchange format stores small
/// sequential integers instead and every load mints fresh values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Mint a fresh random identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the textual form, with or without surrounding braces
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim().trim_start_matches('{').trim_end_matches('}');
        Uuid::parse_str(trimmed)
            .ok()
            .filter(|uuid| !uuid.is_nil())
            .map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ItemId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = ItemId::new();
        let b = ItemId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_accepts_braced_form() {
        let id = ItemId::new();
        let braced = format!("{{{}}}", id);
        assert_eq!(ItemId::parse(&braced), Some(id));
        assert_eq!(ItemId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn test_parse_rejects_garbage_and_nil() {
        assert_eq!(ItemId::parse(""), None);
        assert_eq!(ItemId::parse("12"), None);
        assert_eq!(ItemId::parse("00000000-0000-0000-0000-000000000000"), None);
    }
}
