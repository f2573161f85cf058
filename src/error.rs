//! Error taxonomy shared by the registries, the capability contract and the
//! orchestrator.
//!
//! Every variant is structural: nothing in the crate retries. Variants carry
//! the names involved plus the set of names that *were* known so callers can
//! print an actionable message without re-querying a registry.

use std::path::PathBuf;
use thiserror::Error;

/// Namespace a name lives in. Items, groups and contexts are independent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    Item,
    Group,
    Context,
    Binding,
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Namespace::Item => "item",
            Namespace::Group => "group",
            Namespace::Context => "context",
            Namespace::Binding => "plot group",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A block or source document does not have the expected shape.
    #[error("{context}: {message} (keys: {keys:?})")]
    Schema {
        context: String,
        message: String,
        keys: Vec<String>,
    },

    #[error("{registry} {namespace} '{name}' is already defined")]
    DuplicateName {
        registry: &'static str,
        namespace: Namespace,
        name: String,
    },

    /// A group block referenced a name that was not registered yet.
    #[error("{registry} '{member}' used in group '{group}' is not found in {known:?}")]
    UnresolvedReference {
        registry: &'static str,
        group: String,
        member: String,
        known: Vec<String>,
    },

    #[error("{registry} {namespace} named '{name}' not found in {known:?}")]
    NotFound {
        registry: &'static str,
        namespace: Namespace,
        name: String,
        known: Vec<String>,
    },

    #[error("{owner}: missing configuration option '{key}'")]
    MissingConfig { owner: String, key: String },

    #[error("{owner}: unrecognized configuration parameters {keys:?}")]
    UnrecognizedConfig { owner: String, keys: Vec<String> },

    #[error("{owner}: configuration option '{key}' expects {expected}, got {actual}")]
    InvalidConfig {
        owner: String,
        key: String,
        expected: String,
        actual: String,
    },

    #[error("{owner}: input '{key}' not provided; got {provided:?}")]
    MissingInput {
        owner: String,
        key: String,
        provided: Vec<String>,
    },

    #[error("{owner}: input '{key}' was {actual}, expected {expected}")]
    InputType {
        owner: String,
        key: String,
        expected: String,
        actual: String,
    },

    #[error("{owner}: {message}")]
    InvalidInput { owner: String, message: String },

    /// The module part of a dotted selector is not loadable.
    #[error("could not load module '{module}'; known modules {known:?}")]
    Import { module: String, known: Vec<String> },

    /// The bare class name is not registered (even after loading its module).
    #[error("could not find {capability} class '{name}' in {known:?}")]
    Lookup {
        capability: &'static str,
        name: String,
        known: Vec<String>,
    },

    #[error("{owner}: {message}")]
    Extraction { owner: String, message: String },

    #[error("artifact '{key}' produced more than once")]
    DuplicateArtifact { key: String },

    #[error("{action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("encoding artifact '{key}': {message}")]
    Encode { key: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn schema(
        context: impl Into<String>,
        message: impl Into<String>,
        keys: Vec<String>,
    ) -> Self {
        Error::Schema {
            context: context.into(),
            message: message.into(),
            keys,
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
