//! Splicing located regions into new document text.
//!
//! All transforms compile down to [`Splice`], a byte-span replacement that
//! checks the span still holds the text it was located against. A splice built
//! from stale offsets fails with [`PatchError::StaleRegion`] instead of
//! silently cutting the wrong bytes.

use crate::error::PatchError;
use crate::locator::{Locator, Region};
use crate::marker::Marker;
use serde::Deserialize;
use xxhash_rust::xxh3::xxh3_64;

/// What a splice expects to find before replacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (cheaper to carry for large blocks)
    Hash(u64),
}

impl SpanVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            SpanVerification::ExactMatch(expected) => text == expected,
            SpanVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            SpanVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            SpanVerification::ExactMatch(text.to_string())
        }
    }
}

/// Verified byte-span replacement on in-memory text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Splice does nothing until apply() is called"]
pub struct Splice {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text for [byte_start, byte_end)
    pub new_text: String,
    pub expected_before: SpanVerification,
}

impl Splice {
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: SpanVerification::from_text(expected_before),
        }
    }

    /// Replace a located region.
    pub fn replacing(region: &Region, new_text: impl Into<String>) -> Self {
        Self::new(region.start, region.end, new_text, &region.text)
    }

    /// Insert at a single offset.
    pub fn insertion(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text, "")
    }

    /// Produce the spliced text.
    pub fn apply(&self, text: &str) -> Result<String, PatchError> {
        let stale = || PatchError::StaleRegion {
            byte_start: self.byte_start,
            byte_end: self.byte_end,
        };

        if self.byte_start > self.byte_end
            || self.byte_end > text.len()
            || !text.is_char_boundary(self.byte_start)
            || !text.is_char_boundary(self.byte_end)
        {
            return Err(stale());
        }

        if !self
            .expected_before
            .matches(&text[self.byte_start..self.byte_end])
        {
            return Err(stale());
        }

        let mut out = String::with_capacity(
            text.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        out.push_str(&text[..self.byte_start]);
        out.push_str(&self.new_text);
        out.push_str(&text[self.byte_end..]);
        Ok(out)
    }
}

/// text-before-region + patch + text-after-region.
pub fn replace_region(text: &str, region: &Region, patch: &str) -> Result<String, PatchError> {
    Splice::replacing(region, patch).apply(text)
}

/// Where a relocated fragment goes relative to its anchor.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    Before,
    After,
}

/// Insertion point for a relocated region.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub marker: Marker,
    pub position: Position,
}

/// Re-wrapping applied to a relocated fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wrap {
    pub prefix: String,
    pub suffix: String,
    /// Strip leading and trailing whitespace before wrapping
    pub trim: bool,
}

impl Wrap {
    pub fn render(&self, fragment: &str) -> String {
        let body = if self.trim { fragment.trim() } else { fragment };
        let mut out = String::with_capacity(self.prefix.len() + body.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(body);
        out.push_str(&self.suffix);
        out
    }
}

/// Move `region` to `anchor`.
///
/// The removal uses offsets from `text`. The anchor is then searched again in
/// the text left after removal, so no pre-removal offset survives the cut.
pub fn relocate_region(
    locator: &Locator,
    text: &str,
    region: &Region,
    anchor: &Anchor,
    wrap: &Wrap,
) -> Result<String, PatchError> {
    let without = Splice::replacing(region, "").apply(text)?;

    let (anchor_start, anchor_end) = locator.find_anchor(&without, &anchor.marker)?;
    let at = match anchor.position {
        Position::Before => anchor_start,
        Position::After => anchor_end,
    };
    tracing::debug!(
        removed = region.len(),
        anchor = %anchor.marker,
        at,
        "relocating region"
    );

    Splice::insertion(at, wrap.render(&region.text)).apply(&without)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MatchPolicy;

    fn region(text: &str, needle: &str) -> Region {
        let start = text.find(needle).unwrap();
        Region {
            start,
            end: start + needle.len(),
            text: needle.to_string(),
        }
    }

    #[test]
    fn test_verification_exact_and_hash() {
        let exact = SpanVerification::ExactMatch("hello".to_string());
        assert!(exact.matches("hello"));
        assert!(!exact.matches("hell"));

        let hash = SpanVerification::Hash(xxh3_64(b"hello"));
        assert!(hash.matches("hello"));
        assert!(!hash.matches("world"));
    }

    #[test]
    fn test_verification_from_text_switches_on_size() {
        assert!(matches!(
            SpanVerification::from_text("small"),
            SpanVerification::ExactMatch(_)
        ));
        assert!(matches!(
            SpanVerification::from_text(&"x".repeat(2000)),
            SpanVerification::Hash(_)
        ));
    }

    #[test]
    fn test_replace_region() {
        let text = "<p>old</p>";
        let out = replace_region(text, &region(text, "old"), "new").unwrap();
        assert_eq!(out, "<p>new</p>");
    }

    #[test]
    fn test_splice_rejects_stale_span() {
        let text = "<p>old</p>";
        let located = region(text, "old");
        let shifted = format!("  {text}");
        let result = Splice::replacing(&located, "new").apply(&shifted);
        assert!(matches!(result, Err(PatchError::StaleRegion { .. })));
    }

    #[test]
    fn test_splice_rejects_out_of_range() {
        let splice = Splice::new(3, 50, "x", "");
        assert!(matches!(
            splice.apply("short"),
            Err(PatchError::StaleRegion { .. })
        ));

        let inverted = Splice::new(4, 2, "x", "");
        assert!(matches!(
            inverted.apply("short"),
            Err(PatchError::StaleRegion { .. })
        ));
    }

    #[test]
    fn test_splice_rejects_split_char() {
        // 'ó' is two bytes; offset 1 falls inside it.
        let splice = Splice::new(1, 1, "x", "");
        assert!(matches!(
            splice.apply("ó"),
            Err(PatchError::StaleRegion { .. })
        ));
    }

    #[test]
    fn test_wrap_render() {
        let wrap = Wrap {
            prefix: "\n<!-- moved -->\n".to_string(),
            suffix: "\n".to_string(),
            trim: true,
        };
        assert_eq!(wrap.render("  body \n\n"), "\n<!-- moved -->\nbody\n");

        let raw = Wrap::default();
        assert_eq!(raw.render("  body "), "  body ");
    }

    #[test]
    fn test_relocate_before_anchor() {
        let text = "X[R]Y[A]Z";
        let locator = Locator::new(MatchPolicy::Unique);
        let anchor = Anchor {
            marker: Marker::literal("[A]"),
            position: Position::Before,
        };
        let out = relocate_region(
            &locator,
            text,
            &region(text, "[R]"),
            &anchor,
            &Wrap::default(),
        )
        .unwrap();
        assert_eq!(out, "XY[R][A]Z");
    }

    #[test]
    fn test_relocate_after_anchor_with_wrap() {
        let text = "head\n  [R]  \nmid\n[A]\ntail";
        let locator = Locator::new(MatchPolicy::Unique);
        let anchor = Anchor {
            marker: Marker::literal("[A]"),
            position: Position::After,
        };
        let wrap = Wrap {
            prefix: "\n".to_string(),
            suffix: String::new(),
            trim: true,
        };
        let out = relocate_region(
            &locator,
            text,
            &region(text, "  [R]  \n"),
            &anchor,
            &wrap,
        )
        .unwrap();
        assert_eq!(out, "head\nmid\n[A]\n[R]\ntail");
    }

    #[test]
    fn test_relocate_anchor_searched_after_removal() {
        // The anchor text also appears inside the removed region. Searching the
        // original text would be ambiguous; after removal it is unique.
        let text = "a{[A] moved}b[A]c";
        let locator = Locator::new(MatchPolicy::Unique);
        let anchor = Anchor {
            marker: Marker::literal("[A]"),
            position: Position::Before,
        };
        let out = relocate_region(
            &locator,
            text,
            &region(text, "{[A] moved}"),
            &anchor,
            &Wrap::default(),
        )
        .unwrap();
        assert_eq!(out, "ab{[A] moved}[A]c");
    }

    #[test]
    fn test_relocate_missing_anchor() {
        let text = "X[R]Y";
        let locator = Locator::new(MatchPolicy::Unique);
        let anchor = Anchor {
            marker: Marker::pattern(r"\[A\]").unwrap(),
            position: Position::Before,
        };
        let result = relocate_region(&locator, text, &region(text, "[R]"), &anchor, &Wrap::default());
        assert!(matches!(result, Err(PatchError::PatternNotMatched { .. })));
    }
}
