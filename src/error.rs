//! Error types for vpcsynth.
//!
//! This module defines the error types used throughout vpcsynth, providing
//! enough context to point the user at the offending topology entry.

use std::path::PathBuf;
use thiserror::Error;

use crate::validate::Issue;

/// Result type alias for vpcsynth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for vpcsynth.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Topology Errors
    // ========================================================================
    /// Error parsing a topology document.
    #[error("Failed to parse topology '{path}': {message}")]
    TopologyParse {
        /// Path to the topology file
        path: PathBuf,
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Topology file not found.
    #[error("Topology file not found: {0}")]
    TopologyNotFound(PathBuf),

    /// The topology failed validation.
    #[error("Topology validation failed with {} error(s)", .0.len())]
    Validation(Vec<Issue>),

    // ========================================================================
    // Synthesis Errors
    // ========================================================================
    /// Two resources map to the same logical id.
    #[error("Duplicate logical id '{logical_id}' (from '{name}')")]
    DuplicateLogicalId {
        /// Generated logical id
        logical_id: String,
        /// Construct name that produced it
        name: String,
    },

    /// A construct name produced no usable logical id.
    #[error("Cannot derive a logical id from '{0}'")]
    InvalidLogicalId(String),

    /// The builder looked up a name that was never declared.
    #[error("Unknown {kind} '{name}' referenced by '{referrer}'")]
    UnknownReference {
        /// Kind of resource looked up (subnet, route table, ...)
        kind: &'static str,
        /// Name that was looked up
        name: String,
        /// Construct doing the lookup
        referrer: String,
    },

    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// A Ref/GetAtt/DependsOn points at a resource not in the template.
    #[error("Resource '{from}' references undeclared resource '{to}'")]
    DanglingReference {
        /// Referring logical id
        from: String,
        /// Missing logical id
        to: String,
    },

    /// The resource graph contains a cycle.
    #[error("Dependency cycle: {0}")]
    DependencyCycle(String),

    // ========================================================================
    // Rendering Errors
    // ========================================================================
    /// Template rendering failed.
    #[error("Template rendering failed: {0}")]
    TemplateRender(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // IO and Serialization Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new topology parse error.
    pub fn topology_parse(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::TopologyParse {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a new unknown reference error.
    pub fn unknown_reference(
        kind: &'static str,
        name: impl Into<String>,
        referrer: impl Into<String>,
    ) -> Self {
        Self::UnknownReference {
            kind,
            name: name.into(),
            referrer: referrer.into(),
        }
    }

    /// Returns the validation issues carried by this error, if any.
    pub fn issues(&self) -> &[Issue] {
        match self {
            Error::Validation(issues) => issues,
            _ => &[],
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::UnknownReference { .. } => 4,
            Error::TopologyParse { .. }
            | Error::TopologyNotFound(_)
            | Error::YamlParse(_)
            | Error::JsonParse(_)
            | Error::TomlParse(_) => 5,
            Error::DanglingReference { .. } | Error::DependencyCycle(_) => 6,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
