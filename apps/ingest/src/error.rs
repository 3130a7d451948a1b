//! The closed error taxonomy shown to users, and the classifier that maps
//! loader failures onto it.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::assemble::AssemblyError;
use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::net::FetchError;
use crate::source::SourceKind;
use crate::validate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    FileNotFound,
    InvalidContent,
    MalformedData,
    SheetNotFound,
    Unauthorized,
    InvalidConfig,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileNotFound => "FileNotFound",
            Self::InvalidContent => "InvalidContent",
            Self::MalformedData => "MalformedData",
            Self::SheetNotFound => "SheetNotFound",
            Self::Unauthorized => "Unauthorized",
            Self::InvalidConfig => "InvalidConfig",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure caught at a loader boundary, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("could not parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },
    #[error("{error}")]
    Structure {
        error: ValidationError,
        headers: Vec<String>,
        sample: String,
    },
    #[error(transparent)]
    Auth(AuthError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl From<AuthError> for LoadFailure {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Fetch(fetch) => Self::Fetch(fetch),
            other => Self::Auth(other),
        }
    }
}

/// What the presentation layer receives. User-facing copy is derived from
/// `kind` and `source_kind` by [`crate::render::messages`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub source_kind: Option<SourceKind>,
    /// Technical description of the underlying failure.
    pub message: String,
    /// Parsed headers and a short sample, for content errors.
    pub details: Option<String>,
    /// Account in use, for authorization errors.
    pub account: Option<String>,
}

impl ClassifiedError {
    pub fn invalid_config(error: &ConfigError) -> Self {
        Self {
            kind: ErrorKind::InvalidConfig,
            source_kind: None,
            message: error.to_string(),
            details: None,
            account: None,
        }
    }

    #[must_use]
    pub fn with_account(mut self, account: Option<String>) -> Self {
        self.account = account;
        self
    }

    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.kind, ErrorKind::Unauthorized)
    }
}

/// Maps a loader failure onto the taxonomy. Never panics.
pub fn classify(failure: &LoadFailure, source_kind: SourceKind) -> ClassifiedError {
    let kind = match (failure, source_kind) {
        (LoadFailure::Assembly(_), _) => ErrorKind::MalformedData,
        (LoadFailure::Auth(_), SourceKind::Sheet) => ErrorKind::Unauthorized,
        (LoadFailure::Structure { .. }, SourceKind::Sheet) => ErrorKind::MalformedData,
        (_, SourceKind::Sheet) => ErrorKind::SheetNotFound,
        (LoadFailure::Structure { .. }, SourceKind::Csv | SourceKind::Json) => {
            ErrorKind::InvalidContent
        }
        (_, SourceKind::Csv | SourceKind::Json) => ErrorKind::FileNotFound,
    };

    let details = match failure {
        LoadFailure::Structure {
            headers, sample, ..
        } => Some(format!("columns: [{}]\nsample: {sample}", headers.join(", "))),
        _ => None,
    };

    log::warn!("load failed ({kind}, {source_kind}): {failure}");

    ClassifiedError {
        kind,
        source_kind: Some(source_kind),
        message: failure.to_string(),
        details,
        account: None,
    }
}
