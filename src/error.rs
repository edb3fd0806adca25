//! Error types for import relocation.
//!
//! Configuration inconsistencies are fatal and abort the whole operation.
//! References the scanner cannot identify are not errors at all; they are
//! left untouched.

use thiserror::Error;

pub type Result<T, E = RelocateError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RelocateError {
    /// The root TypeScript configuration exists but has no
    /// `compilerOptions.paths` table to resolve the alias from.
    #[error("unable to resolve \"{alias}\": {config} has no compilerOptions.paths")]
    MissingPathsTable { alias: String, config: String },

    /// The path mapping table has no entry under the resolved alias.
    #[error("unable to find \"{alias}\" in {config} compilerOptions.paths")]
    MissingAlias { alias: String, config: String },

    #[error("project '{0}' not found in workspace")]
    UnknownProject(String),

    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid exclude pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("invalid alias pattern")]
    Regex(#[from] regex::Error),

    #[error("failed to walk {path}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
}

impl RelocateError {
    /// True for the Configuration-Inconsistency class of failures.
    pub fn is_configuration_inconsistency(&self) -> bool {
        matches!(
            self,
            RelocateError::MissingPathsTable { .. } | RelocateError::MissingAlias { .. }
        )
    }
}
