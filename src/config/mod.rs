pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{
    apply_patch, apply_recipe, apply_to_document, resolve_target, ApplicationError, Mode,
    PatchResult, RunReport, Stage,
};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    AnchorSpec, Locate, Metadata, Operation, PatchDefinition, Recipe, ValidationError,
    ValidationIssue,
};
