//! Theme Patcher: batch fixes for XML theme files
//!
//! Walks a theme directory, parses every markup file, and forces a fixed set
//! of child-element values onto the nodes selected by each rule's path query.
//! After the walk, the last parsed tree is rendered in canonical form to a
//! single output file.
//!
//! # Pipeline
//!
//! traversal ([`walk`]) → parse ([`xml::parse_file`]) → patch
//! ([`patch::apply_rules`]) → render ([`xml::to_pretty_string`]), driven
//! sequentially by [`runner::run`].
//!
//! # Example
//!
//! ```no_run
//! use theme_patcher::{run, RunEvent, RunOptions, ThemeConfig};
//!
//! let config = ThemeConfig::builtin();
//! let rules = config.rules().expect("built-in rules are valid");
//! let options = RunOptions::from_config(&config);
//!
//! let summary = run(&rules, &options, |event| {
//!     if let RunEvent::Fixing { path } = event {
//!         println!("fixing: {}", path.display());
//!     }
//! });
//! println!("{:?}", summary);
//! ```

pub mod config;
pub mod output;
pub mod patch;
pub mod runner;
pub mod walk;
pub mod xml;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, ThemeConfig, ValidationError};
pub use output::{write_atomic, OutputError};
pub use patch::{apply_field, apply_rule, apply_rules, FieldChange, PatchReport, Rule};
pub use runner::{run, ErrorPolicy, ProcessedFile, RunError, RunEvent, RunOptions, RunSummary};
pub use walk::{has_extension, markup_files, walk_files, WalkError};
pub use xml::{
    parse_bytes, parse_file, parse_str, to_pretty_string, Document, Element, PathQuery, XmlError,
};
