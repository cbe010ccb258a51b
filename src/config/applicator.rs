//! Recipe applicator - runs a recipe's patches against its target
//!
//! One run is Loader -> Locator -> Transformer -> Writer over a single
//! document:
//! - Patches run in order against the in-memory text, each re-locating from
//!   scratch on the text the previous patch produced
//! - A patch whose applied marker is already present is reported as already
//!   applied without locating
//! - The first failure stops the run and nothing is written

use crate::config::schema::{Operation, PatchDefinition, Recipe};
use crate::document::Document;
use crate::error::PatchError;
use crate::locator::Locator;
use crate::marker::MatchPolicy;
use crate::safety::{ProjectGuard, SafetyError};
use crate::transform::{relocate_region, replace_region};
use std::fmt;
use std::path::{Path, PathBuf};

/// Result of a single patch that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for applied/already-applied"]
pub enum PatchResult {
    /// Patch changed the document
    Applied { file: PathBuf },
    /// Patch had already been applied; document left as is
    AlreadyApplied { file: PathBuf },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { file } => write!(f, "Applied patch to {}", file.display()),
            PatchResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
        }
    }
}

/// Where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Loaded,
    Located,
    Transformed,
    Written,
    LocateFailed,
    TransformFailed,
}

impl Stage {
    pub fn is_failure(self) -> bool {
        matches!(self, Stage::LocateFailed | Stage::TransformFailed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "START",
            Stage::Loaded => "LOADED",
            Stage::Located => "LOCATED",
            Stage::Transformed => "TRANSFORMED",
            Stage::Written => "WRITTEN",
            Stage::LocateFailed => "LOCATE_FAILED",
            Stage::TransformFailed => "TRANSFORM_FAILED",
        };
        f.write_str(name)
    }
}

/// Whether a run may touch the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Write the document when a patch changed it
    Write,
    /// Compute everything, write nothing
    DryRun,
}

/// Errors that stop a recipe before any patch runs
#[derive(Debug)]
pub enum ApplicationError {
    /// Recipe names no target and none was given
    NoTarget { recipe: String },
    /// Target failed the project path guard
    Safety(SafetyError),
    /// Target could not be loaded or written
    Patch(PatchError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::NoTarget { recipe } => {
                write!(f, "recipe '{}' names no target file (use --target)", recipe)
            }
            ApplicationError::Safety(e) => write!(f, "unsafe target: {}", e),
            ApplicationError::Patch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Safety(e) => Some(e),
            ApplicationError::Patch(e) => Some(e),
            ApplicationError::NoTarget { .. } => None,
        }
    }
}

impl From<SafetyError> for ApplicationError {
    fn from(e: SafetyError) -> Self {
        ApplicationError::Safety(e)
    }
}

impl From<PatchError> for ApplicationError {
    fn from(e: PatchError) -> Self {
        ApplicationError::Patch(e)
    }
}

/// Outcome of one recipe run.
#[derive(Debug)]
pub struct RunReport {
    pub file: PathBuf,
    /// One entry per attempted patch, in recipe order; stops at the first error
    pub results: Vec<(String, Result<PatchResult, PatchError>)>,
    pub stage: Stage,
    /// File text as loaded
    pub before: String,
    /// File text after all successful patches (equal to `before` on failure)
    pub after: String,
}

impl RunReport {
    pub fn failed(&self) -> bool {
        self.results.iter().any(|(_, result)| result.is_err())
    }

    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    /// Every patch reported already applied.
    pub fn fully_applied(&self) -> bool {
        !self.results.is_empty()
            && self
                .results
                .iter()
                .all(|(_, result)| matches!(result, Ok(PatchResult::AlreadyApplied { .. })))
    }
}

/// Resolve and guard the file a recipe patches.
///
/// `target` overrides the recipe's `meta.target`. Relative paths resolve
/// against `root`, and the result must stay inside it.
pub fn resolve_target(
    recipe: &Recipe,
    target: Option<&Path>,
    root: &Path,
) -> Result<PathBuf, ApplicationError> {
    let requested = match (target, recipe.meta.target.as_deref()) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(path)) => PathBuf::from(path),
        (None, None) => {
            return Err(ApplicationError::NoTarget {
                recipe: recipe.meta.name.clone(),
            })
        }
    };

    let guard = ProjectGuard::new(root)?;
    let absolute = if requested.is_absolute() {
        requested
    } else {
        guard.project_root().join(requested)
    };

    // A missing target is a load error, not a guard error.
    if !absolute.exists() {
        return Err(PatchError::FileNotFound { path: absolute }.into());
    }

    Ok(guard.validate_path(&absolute)?)
}

/// Run a recipe against `file`.
///
/// Load failures are returned as errors. Patch failures are recorded in the
/// report with the stage the run stopped at; the file is untouched.
pub fn apply_recipe(
    recipe: &Recipe,
    file: &Path,
    mode: Mode,
) -> Result<RunReport, ApplicationError> {
    tracing::debug!(recipe = %recipe.meta.name, stage = %Stage::Start, "run started");

    let mut document = Document::load(file)?;
    tracing::debug!(stage = %Stage::Loaded, file = %file.display());

    let before = document.rendered();
    let (results, stage) = apply_to_document(recipe, &mut document);

    if stage.is_failure() {
        return Ok(RunReport {
            file: file.to_path_buf(),
            results,
            stage,
            after: before.clone(),
            before,
        });
    }

    let after = document.rendered();
    let stage = if mode == Mode::Write && after != before {
        document.write()?;
        Stage::Written
    } else {
        stage
    };
    tracing::debug!(stage = %stage, "run finished");

    Ok(RunReport {
        file: file.to_path_buf(),
        results,
        stage,
        before,
        after,
    })
}

/// Run every patch of `recipe` over an in-memory document.
///
/// On failure the document keeps its loaded text.
pub fn apply_to_document(
    recipe: &Recipe,
    document: &mut Document,
) -> (Vec<(String, Result<PatchResult, PatchError>)>, Stage) {
    let file = document.path().to_path_buf();
    let mut text = document.text().to_string();
    let mut results = Vec::with_capacity(recipe.patches.len());

    for patch in &recipe.patches {
        match apply_patch(patch, recipe.meta.policy, &text) {
            Ok(Some(patched)) => {
                text = patched;
                results.push((patch.id.clone(), Ok(PatchResult::Applied { file: file.clone() })));
            }
            Ok(None) => {
                tracing::info!(patch = %patch.id, "already applied");
                results.push((
                    patch.id.clone(),
                    Ok(PatchResult::AlreadyApplied { file: file.clone() }),
                ));
            }
            Err(err) => {
                let locate_failed = err.is_locate_failure()
                    || matches!(err, PatchError::AmbiguousMarker { .. });
                let stage = if locate_failed {
                    Stage::LocateFailed
                } else {
                    Stage::TransformFailed
                };
                tracing::debug!(patch = %patch.id, stage = %stage, error = %err);
                results.push((patch.id.clone(), Err(err)));
                return (results, stage);
            }
        }
    }

    document.replace_text(text);
    (results, Stage::Transformed)
}

/// Locate and transform for one patch.
///
/// Returns the new text, or `None` when the patch was already applied.
pub fn apply_patch(
    patch: &PatchDefinition,
    default_policy: MatchPolicy,
    text: &str,
) -> Result<Option<String>, PatchError> {
    // Checked before locating: markers that still match after a patch ran
    // must not apply it a second time.
    if let Some(marker) = patch.effective_applied_marker() {
        if text.contains(marker) {
            return Ok(None);
        }
    }

    let locator = Locator::new(patch.policy.unwrap_or(default_policy));
    let target = patch.locate.to_target()?;
    let region = locator.locate(text, &target)?;
    tracing::debug!(patch = %patch.id, stage = %Stage::Located, start = region.start, end = region.end);

    let patched = match &patch.operation {
        Operation::ReplaceRegion { text: replacement } => {
            if region.text == *replacement {
                return Ok(None);
            }
            replace_region(text, &region, replacement)?
        }
        Operation::RelocateRegion { .. } => {
            let Some((anchor, wrap)) = patch.operation.relocation()? else {
                return Ok(None);
            };
            relocate_region(&locator, text, &region, &anchor, &wrap)?
        }
    };
    tracing::debug!(patch = %patch.id, stage = %Stage::Transformed);

    Ok(Some(patched))
}
