//! Region location by literal split, bounded markers, or pattern.
//!
//! Every operation is a pure read of the text. Callers must re-run the
//! locator after each structural edit; offsets are only valid for the text
//! they were computed against.

use crate::error::PatchError;
use crate::marker::{MatchPolicy, Marker};
use serde::Deserialize;

/// A contiguous, non-empty span of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Starting byte offset (inclusive)
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
    /// Text at [start, end) when the region was located
    pub text: String,
}

impl Region {
    fn from_span(text: &str, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            text: text[start..end].to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The document cut at the resolved occurrence of a literal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    /// Text before the marker
    pub before: &'a str,
    /// Text after the marker
    pub after: &'a str,
    /// Byte offset where the marker starts
    pub marker_start: usize,
    /// Byte offset just past the marker
    pub marker_end: usize,
}

/// Which part of a bounded match becomes the region.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Extent {
    /// Strictly between the two markers
    #[default]
    Between,
    /// Start marker through end marker, both included
    Including,
    /// Start marker included, up to (not including) the end marker
    UpTo,
}

/// What to locate.
#[derive(Debug, Clone)]
pub enum Target {
    /// The occurrence of a literal marker itself
    Literal(String),
    /// Span delimited by a literal start marker and the nearest end marker after it
    Bounded {
        start: String,
        end: Marker,
        extent: Extent,
    },
    /// The match of a regular expression
    Pattern(Marker),
}

impl Target {
    /// Short description for diagnostics and logs.
    pub fn describe(&self) -> String {
        match self {
            Target::Literal(marker) => format!("literal {marker:?}"),
            Target::Bounded { start, end, .. } => format!("{start:?} .. {end}"),
            Target::Pattern(marker) => format!("pattern {marker}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Locator {
    policy: MatchPolicy,
}

impl Locator {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Dispatch on the target kind.
    pub fn locate(&self, text: &str, target: &Target) -> Result<Region, PatchError> {
        let region = match target {
            Target::Literal(marker) => self.find_literal(text, marker)?,
            Target::Bounded { start, end, extent } => {
                self.find_bounded_region(text, start, end, *extent)?
            }
            Target::Pattern(pattern) => self.find_by_pattern(text, pattern)?,
        };
        tracing::debug!(
            target = %target.describe(),
            start = region.start,
            end = region.end,
            "region located"
        );
        Ok(region)
    }

    /// Split `text` on a literal marker.
    pub fn split<'a>(&self, text: &'a str, marker: &str) -> Result<Split<'a>, PatchError> {
        let (marker_start, marker_end) = self.policy.select(&Marker::literal(marker), text)?;
        Ok(Split {
            before: &text[..marker_start],
            after: &text[marker_end..],
            marker_start,
            marker_end,
        })
    }

    /// Region covering the marker occurrence itself.
    pub fn find_literal(&self, text: &str, marker: &str) -> Result<Region, PatchError> {
        let split = self.split(text, marker)?;
        Ok(Region::from_span(text, split.marker_start, split.marker_end))
    }

    /// Region delimited by `start` and the nearest `end` after it.
    ///
    /// The start marker is resolved under the match policy; the end marker is
    /// always the first occurrence after the start marker.
    pub fn find_bounded_region(
        &self,
        text: &str,
        start: &str,
        end: &Marker,
        extent: Extent,
    ) -> Result<Region, PatchError> {
        let split = self.split(text, start)?;

        let (end_start, end_end) = match end.find_from(text, split.marker_end) {
            Some(span) => span,
            None if !end.find_all(text).is_empty() => {
                return Err(PatchError::RegionOrderInvalid {
                    start: start.to_string(),
                    end: end.as_str().to_string(),
                });
            }
            None => return Err(end.not_found()),
        };

        let (region_start, region_end) = match extent {
            Extent::Between => (split.marker_end, end_start),
            Extent::Including => (split.marker_start, end_end),
            Extent::UpTo => (split.marker_start, end_start),
        };

        if region_start >= region_end {
            return Err(PatchError::RegionOrderInvalid {
                start: start.to_string(),
                end: end.as_str().to_string(),
            });
        }

        Ok(Region::from_span(text, region_start, region_end))
    }

    /// Region covering the match of `pattern`. Empty matches are ignored.
    pub fn find_by_pattern(&self, text: &str, pattern: &Marker) -> Result<Region, PatchError> {
        let (start, end) = self.policy.select(pattern, text)?;
        Ok(Region::from_span(text, start, end))
    }

    /// Byte span of an insertion anchor, resolved under the match policy.
    pub fn find_anchor(&self, text: &str, anchor: &Marker) -> Result<(usize, usize), PatchError> {
        self.policy.select(anchor, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique() -> Locator {
        Locator::new(MatchPolicy::Unique)
    }

    #[test]
    fn test_split_on_literal() {
        let split = unique().split("head<hr>tail", "<hr>").unwrap();
        assert_eq!(split.before, "head");
        assert_eq!(split.after, "tail");
        assert_eq!((split.marker_start, split.marker_end), (4, 8));
    }

    #[test]
    fn test_split_missing_marker() {
        let result = unique().split("head tail", "<hr>");
        assert!(matches!(result, Err(PatchError::MarkerNotFound { .. })));
    }

    #[test]
    fn test_split_first_policy_uses_first_boundary() {
        let locator = Locator::new(MatchPolicy::First);
        let split = locator.split("a|b|c", "|").unwrap();
        assert_eq!(split.before, "a");
        assert_eq!(split.after, "b|c");
    }

    #[test]
    fn test_bounded_between() {
        let text = "<div>[START]inner text[END]</div>";
        let region = unique()
            .find_bounded_region(text, "[START]", &Marker::literal("[END]"), Extent::Between)
            .unwrap();
        assert_eq!(region.text, "inner text");
        assert!(region.start < region.end);
        assert_eq!(&text[region.start..region.end], "inner text");
    }

    #[test]
    fn test_bounded_extents() {
        let text = "xx<a>body</a>yy";
        let end = Marker::literal("</a>");

        let including = unique()
            .find_bounded_region(text, "<a>", &end, Extent::Including)
            .unwrap();
        assert_eq!(including.text, "<a>body</a>");

        let up_to = unique()
            .find_bounded_region(text, "<a>", &end, Extent::UpTo)
            .unwrap();
        assert_eq!(up_to.text, "<a>body");
    }

    #[test]
    fn test_bounded_end_is_nearest_after_start() {
        let text = "<div><p>one</div><div>two</div>";
        let region = unique()
            .find_bounded_region(text, "<p>", &Marker::literal("</div>"), Extent::Between)
            .unwrap();
        assert_eq!(region.text, "one");
    }

    #[test]
    fn test_bounded_end_pattern() {
        let text = "{cond && (\n  <Block />\n)}\n    <div className=\"header\">";
        let end = Marker::pattern(r#"\n\s*<div className="header">"#).unwrap();
        let region = unique()
            .find_bounded_region(text, "{cond && (", &end, Extent::UpTo)
            .unwrap();
        assert_eq!(region.text, "{cond && (\n  <Block />\n)}");
    }

    #[test]
    fn test_bounded_end_pattern_skips_empty_match() {
        let end = Marker::pattern(r"(?:</e>)?").unwrap();
        let region = unique()
            .find_bounded_region("<s>body</e>", "<s>", &end, Extent::Between)
            .unwrap();
        assert_eq!(region.text, "body");
        assert_eq!((region.start, region.end), (3, 7));
    }

    #[test]
    fn test_bounded_end_before_start_is_order_error() {
        let text = "[END] ... [START] ...";
        let result =
            unique().find_bounded_region(text, "[START]", &Marker::literal("[END]"), Extent::Between);
        assert!(matches!(result, Err(PatchError::RegionOrderInvalid { .. })));
    }

    #[test]
    fn test_bounded_missing_end() {
        let result = unique().find_bounded_region(
            "[START] ...",
            "[START]",
            &Marker::literal("[END]"),
            Extent::Between,
        );
        assert!(matches!(result, Err(PatchError::MarkerNotFound { .. })));
    }

    #[test]
    fn test_bounded_missing_start() {
        let result =
            unique().find_bounded_region("... [END]", "[START]", &Marker::literal("[END]"), Extent::Between);
        match result {
            Err(PatchError::MarkerNotFound { marker }) => assert_eq!(marker, "[START]"),
            other => panic!("expected MarkerNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_bounded_adjacent_markers_rejected() {
        let result =
            unique().find_bounded_region("[S][E]", "[S]", &Marker::literal("[E]"), Extent::Between);
        assert!(matches!(result, Err(PatchError::RegionOrderInvalid { .. })));
    }

    #[test]
    fn test_pattern_region() {
        let pattern = Marker::pattern(r"</div>\s*</div>\s*<ClientModal").unwrap();
        let text = "body\n    </div>\n  </div>\n  <ClientModal />";
        let region = unique().find_by_pattern(text, &pattern).unwrap();
        assert_eq!(region.start, 9);
        assert!(region.text.ends_with("<ClientModal"));
    }

    #[test]
    fn test_pattern_not_matched() {
        let pattern = Marker::pattern(r"<ClientModal").unwrap();
        let result = unique().find_by_pattern("nothing here", &pattern);
        assert!(matches!(result, Err(PatchError::PatternNotMatched { .. })));
    }

    #[test]
    fn test_pattern_ambiguity_follows_policy() {
        let pattern = Marker::pattern(r"b+").unwrap();
        let text = "abba abbba";

        let result = unique().find_by_pattern(text, &pattern);
        assert!(matches!(
            result,
            Err(PatchError::AmbiguousMarker { count: 2, .. })
        ));

        let region = Locator::new(MatchPolicy::First)
            .find_by_pattern(text, &pattern)
            .unwrap();
        assert_eq!((region.start, region.end), (1, 3));
    }

    #[test]
    fn test_locate_dispatch() {
        let target = Target::Literal("needle".to_string());
        let region = unique().locate("hay needle hay", &target).unwrap();
        assert_eq!(region.text, "needle");
        assert_eq!(region.len(), 6);
    }
}
