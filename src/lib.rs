//! Page Patcher: marker-based text patching for generated page sources
//!
//! Applies small, recipe-driven edits to a single source file (such as a
//! dashboard page component) without parsing it. Blocks are found by literal
//! markers or regular expressions and then replaced or moved.
//!
//! # Architecture
//!
//! Each run is Loader -> Locator -> Transformer -> Writer:
//!
//! - [`Document`] loads the file as UTF-8 and writes it back atomically
//! - [`Locator`] turns [`Marker`]s into a [`Region`]
//! - [`transform`] splices replacement or relocated text via verified
//!   [`Splice`]s
//! - [`config`] reads TOML recipes and drives the run
//!
//! # Safety
//!
//! - Ambiguous markers fail unless the recipe opts into first-match
//! - Splices verify the text they replace, so stale offsets cannot cut the
//!   wrong bytes
//! - Atomic file writes (tempfile + fsync + rename)
//! - Targets are confined to the project root
//! - Re-running a recipe is detected as already applied
//!
//! # Example
//!
//! ```
//! use page_patcher::{Extent, Locator, MatchPolicy, Marker, replace_region};
//!
//! let text = "<div><b>old</b></div>";
//! let locator = Locator::new(MatchPolicy::Unique);
//! let region = locator
//!     .find_bounded_region(text, "<b>", &Marker::literal("</b>"), Extent::Between)
//!     .unwrap();
//! let patched = replace_region(text, &region, "new").unwrap();
//! assert_eq!(patched, "<div><b>new</b></div>");
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod locator;
pub mod logging;
pub mod marker;
pub mod safety;
pub mod transform;

// Re-exports
pub use config::{
    apply_recipe, load_from_path, load_from_str, resolve_target, ApplicationError, ConfigError,
    Mode, PatchResult, Recipe, RunReport, Stage,
};
pub use document::{Document, LineEnding};
pub use error::PatchError;
pub use locator::{Extent, Locator, Region, Split, Target};
pub use marker::{MatchPolicy, Marker};
pub use safety::{ProjectGuard, SafetyError};
pub use transform::{
    relocate_region, replace_region, Anchor, Position, SpanVerification, Splice, Wrap,
};
