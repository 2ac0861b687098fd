//! # Parameter File Resolution
//!
//! Where the patch file comes from decides how strict loading is: an
//! explicitly named file must exist, the well-known default may be absent.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::ParamError;
use crate::{DEFAULT_PARAMS_FILE, PARAMS_FILE_ENV};

/// Location of the parameter patch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// Named explicitly; missing or unreadable is fatal.
    Explicit(PathBuf),
    /// Well-known fallback; absence is tolerated.
    Default(PathBuf),
}

impl ParamSource {
    /// Resolve from [`PARAMS_FILE_ENV`], falling back to
    /// [`DEFAULT_PARAMS_FILE`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(std::env::var_os(PARAMS_FILE_ENV).map(PathBuf::from))
    }

    /// Resolve from an already read environment value.
    #[must_use]
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        match explicit {
            Some(path) => Self::Explicit(path),
            None => Self::Default(PathBuf::from(DEFAULT_PARAMS_FILE)),
        }
    }

    /// Path to read.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) | Self::Default(path) => path,
        }
    }

    /// Whether a missing file is an error.
    #[must_use]
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }

    /// Read and parse the patch document.
    ///
    /// Returns `Ok(None)` only for an absent default file.
    ///
    /// # Errors
    ///
    /// - [`ParamError::MissingFile`] if an explicit file cannot be read
    /// - [`ParamError::Parse`] if the file exists but is not valid JSON
    pub fn read(&self) -> Result<Option<Value>, ParamError> {
        let path = self.path();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(source) if self.is_required() => {
                return Err(ParamError::MissingFile {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No default parameter file, using node defaults only");
                return Ok(None);
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| ParamError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl Default for ParamSource {
    fn default() -> Self {
        Self::resolve(None)
    }
}
