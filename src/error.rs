//! Error type shared by the whole crate.
//!
//! Only failures that stop a run surface as [`Error`]. Problems scoped to a
//! single project are reported as [`crate::report::Warning`] values instead.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document is not well-formed XML.
    #[error("{}: XML error: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    /// An MSBuild `Condition` attribute could not be parsed.
    #[error("failed to parse condition '{condition}': {message}")]
    Condition { condition: String, message: String },

    /// The input path is neither a solution nor a project document.
    #[error("{}: unsupported input (expected .sln, .slnx or .vcxproj)", path.display())]
    UnsupportedInput { path: PathBuf },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn xml(path: impl Into<PathBuf>, source: roxmltree::Error) -> Self {
        Self::Xml {
            path: path.into(),
            source,
        }
    }
}
