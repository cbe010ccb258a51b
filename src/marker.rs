//! Markers and the match policy applied when a marker occurs more than once.

use crate::error::PatchError;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

/// A literal or regular-expression delimiter.
#[derive(Debug, Clone)]
pub enum Marker {
    Literal(String),
    Pattern(Regex),
}

impl Marker {
    pub fn literal(text: impl Into<String>) -> Self {
        Marker::Literal(text.into())
    }

    /// Compile `pattern` into a pattern marker.
    pub fn pattern(pattern: &str) -> Result<Self, PatchError> {
        Regex::new(pattern)
            .map(Marker::Pattern)
            .map_err(|source| PatchError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// The marker as authored, for diagnostics.
    pub fn as_str(&self) -> &str {
        match self {
            Marker::Literal(text) => text,
            Marker::Pattern(regex) => regex.as_str(),
        }
    }

    /// First non-empty occurrence starting at or after byte `from`.
    ///
    /// Pattern markers are evaluated against the whole text so anchors and
    /// word boundaries see the real surrounding context.
    pub fn find_from(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        if from > text.len() {
            return None;
        }
        match self {
            Marker::Literal(literal) => text[from..]
                .find(literal.as_str())
                .map(|idx| (from + idx, from + idx + literal.len())),
            Marker::Pattern(regex) => {
                let mut at = from;
                while at <= text.len() {
                    let m = regex.find_at(text, at)?;
                    if m.start() < m.end() {
                        return Some((m.start(), m.end()));
                    }
                    at = m.end() + text[m.end()..].chars().next().map_or(1, char::len_utf8);
                }
                None
            }
        }
    }

    /// Every non-overlapping, non-empty occurrence in `text`.
    pub fn find_all(&self, text: &str) -> Vec<(usize, usize)> {
        match self {
            Marker::Literal(literal) => text
                .match_indices(literal.as_str())
                .map(|(idx, m)| (idx, idx + m.len()))
                .collect(),
            Marker::Pattern(regex) => regex
                .find_iter(text)
                .filter(|m| m.start() < m.end())
                .map(|m| (m.start(), m.end()))
                .collect(),
        }
    }

    /// Error reported when this marker never occurs.
    pub fn not_found(&self) -> PatchError {
        match self {
            Marker::Literal(literal) => PatchError::MarkerNotFound {
                marker: literal.clone(),
            },
            Marker::Pattern(regex) => PatchError::PatternNotMatched {
                pattern: regex.as_str().to_string(),
            },
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Literal(text) => write!(f, "{text:?}"),
            Marker::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// How a marker that occurs several times is resolved.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// More than one occurrence is an error.
    #[default]
    Unique,
    /// Take the first occurrence.
    First,
}

impl MatchPolicy {
    /// Resolve the single occurrence of `marker` in `text`.
    pub fn select(self, marker: &Marker, text: &str) -> Result<(usize, usize), PatchError> {
        let occurrences = marker.find_all(text);
        let first = *occurrences.first().ok_or_else(|| marker.not_found())?;

        if occurrences.len() > 1 {
            let count = occurrences.len();
            match self {
                MatchPolicy::Unique => {
                    return Err(PatchError::AmbiguousMarker {
                        marker: marker.as_str().to_string(),
                        count,
                    });
                }
                MatchPolicy::First => {
                    tracing::warn!(
                        marker = %marker,
                        count,
                        "marker is ambiguous, using first occurrence"
                    );
                }
            }
        }

        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_find_from_offset() {
        let marker = Marker::literal("</div>");
        let text = "<div></div><div></div>";
        assert_eq!(marker.find_from(text, 0), Some((5, 11)));
        assert_eq!(marker.find_from(text, 6), Some((16, 22)));
        assert_eq!(marker.find_from(text, 17), None);
        assert_eq!(marker.find_from(text, 99), None);
    }

    #[test]
    fn test_pattern_find_from_offset() {
        let marker = Marker::pattern(r"</div>\s*<Modal").unwrap();
        let text = "</div>\n  <Modal /></div> <Modal />";
        assert_eq!(marker.find_from(text, 0), Some((0, 15)));
        assert_eq!(marker.find_from(text, 1), Some((18, 31)));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = Marker::pattern("(unclosed");
        assert!(matches!(result, Err(PatchError::InvalidPattern { .. })));
    }

    #[test]
    fn test_not_found_error_kind() {
        assert!(matches!(
            Marker::literal("x").not_found(),
            PatchError::MarkerNotFound { .. }
        ));
        assert!(matches!(
            Marker::pattern("x+").unwrap().not_found(),
            PatchError::PatternNotMatched { .. }
        ));
    }

    #[test]
    fn test_unique_policy_rejects_duplicates() {
        let marker = Marker::literal("Pedir");
        let result = MatchPolicy::Unique.select(&marker, "Pedir / Pedir / Pedir");
        match result {
            Err(PatchError::AmbiguousMarker { count, .. }) => assert_eq!(count, 3),
            other => panic!("expected AmbiguousMarker, got {other:?}"),
        }
    }

    #[test]
    fn test_first_policy_takes_first() {
        let marker = Marker::literal("Pedir");
        let span = MatchPolicy::First
            .select(&marker, "xx Pedir / Pedir")
            .unwrap();
        assert_eq!(span, (3, 8));
    }

    #[test]
    fn test_empty_pattern_matches_are_skipped() {
        let marker = Marker::pattern(r"x*</main>|\s*").unwrap();
        let text = "<main></main>";
        assert_eq!(marker.find_all(text), vec![(6, 13)]);
        assert_eq!(marker.find_from(text, 0), Some((6, 13)));
        assert_eq!(MatchPolicy::Unique.select(&marker, text).unwrap(), (6, 13));

        let only_empty = Marker::pattern(r"z*").unwrap();
        assert_eq!(only_empty.find_from("ab", 0), None);
        assert!(matches!(
            MatchPolicy::Unique.select(&only_empty, "ab"),
            Err(PatchError::PatternNotMatched { .. })
        ));
    }

    #[test]
    fn test_policy_missing_marker() {
        let marker = Marker::literal("absent");
        assert!(matches!(
            MatchPolicy::First.select(&marker, "text"),
            Err(PatchError::MarkerNotFound { .. })
        ));
    }
}
