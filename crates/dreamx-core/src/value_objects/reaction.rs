//! Reaction kinds and the toggle result shared by posts, messages, and comments

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::DomainError;

/// Maximum length of a named reaction kind (`like`, `celebrate`, ...)
pub const MAX_KIND_LEN: usize = 32;

/// Maximum byte length accepted for an emoji reaction
const MAX_EMOJI_BYTES: usize = 16;

/// Validated reaction kind
///
/// Either a short lowercase word (`[a-z0-9_]`) or a single emoji grapheme.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReactionKind(String);

impl ReactionKind {
    /// The kind used for comment likes when none is given
    pub const LIKE: &'static str = "like";

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let kind = raw.trim();
        if kind.is_empty() {
            return Err(DomainError::InvalidReaction("reaction kind is empty".to_string()));
        }

        let is_word = kind.len() <= MAX_KIND_LEN
            && kind
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        let is_emoji = kind.len() <= MAX_EMOJI_BYTES && is_single_emoji(kind);

        if is_word || is_emoji {
            Ok(Self(kind.to_string()))
        } else {
            Err(DomainError::InvalidReaction(format!(
                "unsupported reaction kind: {kind}"
            )))
        }
    }

    pub fn like() -> Self {
        Self(Self::LIKE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One extended grapheme cluster carrying at least one pictographic code point
fn is_single_emoji(s: &str) -> bool {
    let mut graphemes = s.graphemes(true);
    matches!((graphemes.next(), graphemes.next()), (Some(_), None)) && s.chars().any(is_emoji_char)
}

fn is_emoji_char(c: char) -> bool {
    matches!(
        u32::from(c),
        0x00A9 | 0x00AE
            | 0x203C | 0x2049
            | 0x2122 | 0x2139
            | 0x2194..=0x21AA
            | 0x231A..=0x23FF
            | 0x24C2
            | 0x25AA..=0x25FE
            | 0x2600..=0x27BF
            | 0x2934 | 0x2935
            | 0x2B05..=0x2B55
            | 0x3030 | 0x303D | 0x3297 | 0x3299
            // regional indicators, pictographs, emoticons, transport, supplemental symbols
            | 0x1F000..=0x1FAFF
    )
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReactionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// What a toggle did to the (subject, user) row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    /// No row existed; one was inserted
    Set,
    /// A row with the same kind existed; it was deleted
    Cleared,
    /// A row with a different kind existed; its kind was replaced
    Updated,
}

impl ToggleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Cleared => "cleared",
            Self::Updated => "updated",
        }
    }

    /// Whether the acting user holds a reaction after the toggle
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Cleared)
    }
}

/// Per-kind reaction counts for one subject, ordered by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionSummary(BTreeMap<String, i64>);

impl ReactionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(kind, count)` rows; zero counts are dropped
    pub fn from_counts<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self(
            rows.into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(kind, count)| (kind.into(), count))
                .collect(),
        )
    }

    pub fn get(&self, kind: &str) -> i64 {
        self.0.get(kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Kind of content a reaction is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTarget {
    Post,
    Message,
    Comment,
}

impl ReactionTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Message => "message",
            Self::Comment => "comment",
        }
    }
}

/// Result of a reaction toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionToggle {
    pub outcome: ToggleOutcome,
    /// The kind the user holds afterwards (`None` once cleared)
    pub kind: Option<String>,
    pub counts: ReactionSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_kind_accepts_words_and_emoji() {
        assert_eq!(ReactionKind::parse("like").unwrap().as_str(), "like");
        assert_eq!(ReactionKind::parse(" celebrate ").unwrap().as_str(), "celebrate");
        assert!(ReactionKind::parse("🔥").is_ok());
        assert!(ReactionKind::parse("❤️").is_ok());
        assert!(ReactionKind::parse("👍🏽").is_ok());
        assert!(ReactionKind::parse("🇯🇵").is_ok());
    }

    #[test]
    fn test_reaction_kind_rejects_garbage() {
        assert!(ReactionKind::parse("").is_err());
        assert!(ReactionKind::parse("Like").is_err());
        assert!(ReactionKind::parse("two words").is_err());
        assert!(ReactionKind::parse(&"a".repeat(MAX_KIND_LEN + 1)).is_err());
        assert!(ReactionKind::parse("héllo").is_err());
        assert!(ReactionKind::parse("ab😀").is_err());
        assert!(ReactionKind::parse("日本語").is_err());
        assert!(ReactionKind::parse("日").is_err());
        assert!(ReactionKind::parse("🔥🔥🔥🔥").is_err());
        assert!(ReactionKind::parse("🔥 🔥").is_err());
    }

    #[test]
    fn test_summary_drops_zero_counts() {
        let summary = ReactionSummary::from_counts([("like", 2), ("sad", 0)]);
        assert_eq!(summary.get("like"), 2);
        assert_eq!(summary.get("sad"), 0);
        assert_eq!(summary.total(), 2);
        assert_eq!(serde_json::to_string(&summary).unwrap(), r#"{"like":2}"#);
    }

    #[test]
    fn test_empty_summary_serializes_as_empty_object() {
        assert_eq!(serde_json::to_string(&ReactionSummary::new()).unwrap(), "{}");
    }

    #[test]
    fn test_toggle_outcome_serialization() {
        assert_eq!(serde_json::to_string(&ToggleOutcome::Cleared).unwrap(), "\"cleared\"");
        assert!(ToggleOutcome::Updated.is_active());
        assert!(!ToggleOutcome::Cleared.is_active());
    }
}
