//! Error type shared by the store, the ordering routines and the command layer.
//!
//! Rendering itself never fails: absent values and mismatched configuration
//! degrade to empty or "No" output. Everything here is raised before a render
//! is attempted or while the template store is being mutated.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by template storage, configuration and structural edits.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store or value file is not valid JSON, or names an unknown section kind
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Configuration could not be serialised
    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Template {0} not found")]
    TemplateNotFound(u64),

    #[error("Section group {0} not found")]
    GroupNotFound(u64),

    #[error("Section {0} not found")]
    SectionNotFound(u64),

    /// Section kind outside the closed set
    #[error("Unknown section kind '{0}'. Expected one of: field, checkbox, section, date, select, instruction")]
    UnknownVariant(String),

    #[error("A {kind} section needs a title")]
    MissingTitle { kind: &'static str },

    #[error("A section group needs a title")]
    BlankGroup,

    #[error("Template {field} must not be empty")]
    BlankTemplateField { field: &'static str },

    /// A section's kind is fixed once created
    #[error("Cannot change a {from} section into a {to} section; delete and re-add it instead")]
    KindChange { from: &'static str, to: &'static str },

    /// Sibling positions are not exactly `0..N-1`
    #[error("Ordering corrupt in {scope}: expected positions 0..{len}, found {found:?}")]
    OrderingCorrupt {
        scope: String,
        len: usize,
        found: Vec<u32>,
    },

    /// Another process holds the store lock
    #[error("Timed out waiting for lock on {}", path.display())]
    LockTimeout { path: PathBuf },

    /// A `--set` argument or value file entry could not be understood
    #[error("Invalid value '{0}': expected SECTION_ID=VALUE")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, Error>;
