//! Error management for the database compiler.
//!
//! Errors come in two kinds. `Error` means the database or the run as a whole cannot
//! be trusted and the compilation must stop before anything is written to disk.
//! `ImportError` is local to one raw tuning-run file: the file is skipped and the
//! remaining files are still merged.
use std::io;
use std::path::PathBuf;

use failure::Fail;

/// A fatal error, aborting the whole compilation.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(
        display = "results of section {} use different parameter names: {:?} and {:?}",
        section, expected, found
    )]
    InconsistentParameters {
        section: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[fail(
        display = "entries for a single kernel with multiple argument values: {}",
        group
    )]
    MismatchedArguments { group: String },
    #[fail(display = "cannot group an empty set of records")]
    EmptyInput,
    #[fail(display = "section {} has no tuning results", section)]
    EmptyResults { section: String },
    #[fail(display = "malformed compact result `{}` for parameters {:?}", values, names)]
    MalformedCompactResult { values: String, names: Vec<String> },
    #[fail(display = "unknown precision `{}`", _0)]
    UnknownPrecision(String),
    #[fail(
        display = "{} tuning parameters for the `{}` kernel family, at most {} are supported",
        count, family, max
    )]
    TooManyParameters {
        family: String,
        count: usize,
        max: usize,
    },
    #[fail(
        display = "the path `{}` does not point to the root of the library",
        _0
    )]
    InvalidLibraryRoot(String),
    #[fail(display = "unable to download `{}`: {}", url, reason)]
    Download { url: String, reason: String },
    #[fail(display = "{}: {}", path, error)]
    Io {
        path: String,
        #[cause]
        error: io::Error,
    },
    #[fail(display = "{}", _0)]
    Json(#[cause] serde_json::Error),
    #[fail(display = "invalid configuration: {}", _0)]
    Config(#[cause] config::ConfigError),
}

impl Error {
    /// Wraps an I/O error with the path it occured on.
    pub fn io<P: Into<PathBuf>>(path: P, error: io::Error) -> Self {
        Error::Io {
            path: path.into().display().to_string(),
            error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json(error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error)
    }
}

/// A problem with a single raw tuning-run file. The file is skipped.
#[derive(Debug, Fail)]
pub enum ImportError {
    #[fail(display = "{}", _0)]
    Io(#[cause] io::Error),
    #[fail(display = "invalid JSON: {}", _0)]
    Json(#[cause] serde_json::Error),
    #[fail(display = "missing field `{}`", _0)]
    MissingField(&'static str),
    #[fail(display = "the tuning run has no results")]
    NoResults,
    #[fail(display = "no kernel name in the tuning run")]
    MissingKernel,
    #[fail(display = "results mix kernels `{}` and `{}`", expected, found)]
    KernelMismatch { expected: String, found: String },
    #[fail(
        display = "PRECISION parameter {} does not match the precision `{}`",
        found, expected
    )]
    PrecisionMismatch { expected: String, found: i64 },
}

impl From<io::Error> for ImportError {
    fn from(error: io::Error) -> Self {
        ImportError::Io(error)
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(error: serde_json::Error) -> Self {
        ImportError::Json(error)
    }
}
