//! Classification of the failures that abort a pipeline run
//!
//! Errors are propagated as [`anyhow::Error`]. A [`Failure`] is attached as
//! context at the point where the failing stage and file are known, so that
//! the final report tells the operator where things went wrong.

use std::{
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
};

/// What went wrong, and where
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Failure {
    /// Input dataset could not be read, or one of its records is malformed
    SourceData {
        /// Input file
        path: PathBuf,

        /// 1-based line number of the offending record, if any
        line: Option<usize>,
    },

    /// Reference corpus query failed or returned unusable data
    ExternalService {
        /// Queried phrases
        phrases: Box<str>,
    },

    /// An intermediate or output artifact could not be written
    OutputWrite {
        /// Artifact that was being written
        path: PathBuf,
    },
}
//
impl Failure {
    /// Failure to read a whole input file
    pub fn source_file(path: &Path) -> Self {
        Self::SourceData {
            path: path.to_owned(),
            line: None,
        }
    }

    /// Failure to parse one record of an input file
    pub fn source_line(path: &Path, line: usize) -> Self {
        Self::SourceData {
            path: path.to_owned(),
            line: Some(line),
        }
    }

    /// Failure of a reference corpus query
    pub fn external(phrases: &[Box<str>]) -> Self {
        Self::ExternalService {
            phrases: phrases.join(", ").into(),
        }
    }

    /// Failure to write an artifact
    pub fn output(path: &Path) -> Self {
        Self::OutputWrite {
            path: path.to_owned(),
        }
    }
}
//
impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceData { path, line: None } => {
                write!(f, "reading source data from {}", path.display())
            }
            Self::SourceData {
                path,
                line: Some(line),
            } => write!(f, "parsing record at {}:{line}", path.display()),
            Self::ExternalService { phrases } => {
                write!(f, "querying the reference corpus for [{phrases}]")
            }
            Self::OutputWrite { path } => write!(f, "writing {}", path.display()),
        }
    }
}
