pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    Metadata, RuleDefinition, ThemeConfig, ValidationError, ValidationIssue, DEFAULT_EXTENSION,
    DEFAULT_OUTPUT, DEFAULT_ROOT,
};
