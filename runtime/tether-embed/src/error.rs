//! Failure kinds surfaced by the embedding facade.
//!
//! Decode mismatches are deliberately not here: `decode` reports them as a
//! `bool` and callers decide whether a failed conversion is fatal.

use std::fmt;

use tether_runtime::ErrorState;

/// A failed facade operation, carrying the name that failed and the drained
/// runtime error text. Non-transient by policy: nothing here is retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmbedError {
    /// Script loading failed.
    Load { path: String, message: String },
    /// Attribute absent or lookup failed.
    Attribute { name: String, message: String },
    /// The resolved callable failed inside the runtime.
    Invocation { function: String, message: String },
}

impl EmbedError {
    pub(crate) fn load(path: &str, state: Option<ErrorState>) -> Self {
        EmbedError::Load {
            path: path.to_string(),
            message: state_text(state),
        }
    }

    pub(crate) fn attribute(name: &str, state: Option<ErrorState>) -> Self {
        EmbedError::Attribute {
            name: name.to_string(),
            message: state_text(state),
        }
    }

    pub(crate) fn invocation(function: &str, state: Option<ErrorState>) -> Self {
        EmbedError::Invocation {
            function: function.to_string(),
            message: state_text(state),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EmbedError::Load { .. } => "LoadError",
            EmbedError::Attribute { .. } => "AttributeError",
            EmbedError::Invocation { .. } => "InvocationError",
        }
    }
}

fn state_text(state: Option<ErrorState>) -> String {
    match state {
        Some(err) => format!("{}: {}", err.kind, err.message),
        None => "unknown runtime error".to_string(),
    }
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedError::Load { path, message } => {
                write!(f, "failed to load script '{path}': {message}")
            }
            EmbedError::Attribute { name, message } => {
                write!(f, "attribute lookup '{name}' failed: {message}")
            }
            EmbedError::Invocation { function, message } => {
                write!(f, "call to '{function}' failed: {message}")
            }
        }
    }
}

impl std::error::Error for EmbedError {}
