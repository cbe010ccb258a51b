use crate::error::PatchError;
use crate::locator::{Extent, Target};
use crate::marker::{MatchPolicy, Marker};
use crate::transform::{Anchor, Position, Wrap};
use regex::Regex;
use serde::Deserialize;
use std::fmt;

/// A recipe file: one target and an ordered list of patches.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Recipe {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
}

impl Recipe {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        if let Some(target) = &self.meta.target {
            if target.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "meta.target",
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for patch in &self.patches {
            let id = Some(patch.id.clone());

            if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            } else if !seen.insert(patch.id.as_str()) {
                issues.push(ValidationIssue::InvalidCombo {
                    patch_id: id.clone(),
                    message: "duplicate patch id".to_string(),
                });
            }

            if let Some(marker) = &patch.applied_marker {
                if marker.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        patch_id: id.clone(),
                        field: "applied_marker",
                    });
                }
            }

            match &patch.locate {
                Locate::Literal { marker } => {
                    if marker.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: id.clone(),
                            field: "locate.marker",
                        });
                    }
                }
                Locate::Bounded {
                    start,
                    end,
                    end_pattern,
                    ..
                } => {
                    if start.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: id.clone(),
                            field: "locate.start",
                        });
                    }
                    match (end, end_pattern) {
                        (None, None) => issues.push(ValidationIssue::MissingField {
                            patch_id: id.clone(),
                            field: "locate.end",
                        }),
                        (Some(_), Some(_)) => issues.push(ValidationIssue::InvalidCombo {
                            patch_id: id.clone(),
                            message: "end and end_pattern cannot both be set".to_string(),
                        }),
                        (Some(end), None) if end.is_empty() => {
                            issues.push(ValidationIssue::MissingField {
                                patch_id: id.clone(),
                                field: "locate.end",
                            })
                        }
                        (None, Some(pattern)) => {
                            check_regex(&mut issues, &id, "locate.end_pattern", pattern)
                        }
                        _ => {}
                    }
                }
                Locate::Pattern { regex } => {
                    check_regex(&mut issues, &id, "locate.regex", regex);
                }
            }

            match &patch.operation {
                Operation::ReplaceRegion { text } => {
                    if text.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: id.clone(),
                            field: "operation.text",
                        });
                    }
                }
                Operation::RelocateRegion { anchor, .. } => match anchor {
                    AnchorSpec::Literal { marker } => {
                        if marker.is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                patch_id: id.clone(),
                                field: "operation.anchor.marker",
                            });
                        }
                    }
                    AnchorSpec::Pattern { regex } => {
                        check_regex(&mut issues, &id, "operation.anchor.regex", regex);
                    }
                },
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

fn check_regex(
    issues: &mut Vec<ValidationIssue>,
    patch_id: &Option<String>,
    field: &'static str,
    pattern: &str,
) {
    if pattern.is_empty() {
        issues.push(ValidationIssue::MissingField {
            patch_id: patch_id.clone(),
            field,
        });
    } else if let Err(err) = Regex::new(pattern) {
        issues.push(ValidationIssue::InvalidCombo {
            patch_id: patch_id.clone(),
            message: format!("{field} is not a valid regex: {err}"),
        });
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// File the recipe patches, relative to the project root
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub policy: MatchPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    /// Overrides `meta.policy` for this patch
    #[serde(default)]
    pub policy: Option<MatchPolicy>,
    /// Text whose presence means the patch already ran
    #[serde(default)]
    pub applied_marker: Option<String>,
    pub locate: Locate,
    pub operation: Operation,
}

impl PatchDefinition {
    /// Explicit applied marker, or the default derived from the operation.
    pub fn effective_applied_marker(&self) -> Option<&str> {
        if let Some(marker) = &self.applied_marker {
            return Some(marker.as_str());
        }
        match &self.operation {
            Operation::ReplaceRegion { text } => Some(text.as_str()),
            Operation::RelocateRegion { prefix, .. } => {
                let trimmed = prefix.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Locate {
    /// Exact occurrence of a literal string
    Literal { marker: String },
    /// Span between a literal start marker and a literal or pattern end marker
    Bounded {
        start: String,
        #[serde(default)]
        end: Option<String>,
        #[serde(default)]
        end_pattern: Option<String>,
        #[serde(default)]
        extent: Extent,
    },
    /// Match of a regular expression
    Pattern { regex: String },
}

impl Locate {
    pub fn to_target(&self) -> Result<Target, PatchError> {
        match self {
            Locate::Literal { marker } => Ok(Target::Literal(marker.clone())),
            Locate::Bounded {
                start,
                end,
                end_pattern,
                extent,
            } => {
                let end = match (end, end_pattern) {
                    (_, Some(pattern)) => Marker::pattern(pattern)?,
                    (Some(end), None) => Marker::literal(end.clone()),
                    // Rejected by validation; kept total for hand-built recipes.
                    (None, None) => {
                        return Err(PatchError::MarkerNotFound {
                            marker: format!("end marker for {start:?}"),
                        })
                    }
                };
                Ok(Target::Bounded {
                    start: start.clone(),
                    end,
                    extent: *extent,
                })
            }
            Locate::Pattern { regex } => Ok(Target::Pattern(Marker::pattern(regex)?)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    ReplaceRegion {
        text: String,
    },
    RelocateRegion {
        anchor: AnchorSpec,
        #[serde(default)]
        position: Position,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
        #[serde(default = "default_trim")]
        trim: bool,
    },
}

fn default_trim() -> bool {
    true
}

impl Operation {
    /// Anchor and wrap for a relocation, `None` for replacements.
    pub fn relocation(&self) -> Result<Option<(Anchor, Wrap)>, PatchError> {
        match self {
            Operation::ReplaceRegion { .. } => Ok(None),
            Operation::RelocateRegion {
                anchor,
                position,
                prefix,
                suffix,
                trim,
            } => Ok(Some((
                Anchor {
                    marker: anchor.to_marker()?,
                    position: *position,
                },
                Wrap {
                    prefix: prefix.clone(),
                    suffix: suffix.clone(),
                    trim: *trim,
                },
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AnchorSpec {
    Literal { marker: String },
    Pattern { regex: String },
}

impl AnchorSpec {
    pub fn to_marker(&self) -> Result<Marker, PatchError> {
        match self {
            AnchorSpec::Literal { marker } => Ok(Marker::literal(marker.clone())),
            AnchorSpec::Pattern { regex } => Marker::pattern(regex),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyPatchList,
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        patch_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "recipe contains no patches"),
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "recipe missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { patch_id, message } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid recipe configuration: {message}"),
            },
        }
    }
}
