//! Error types for session loading and parsing.

use std::fmt;

use catalog::CatalogError;
use replay::ReplayError;
use wire::WireError;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by the session layer.
///
/// Filtering never fails; per-message decode failures are recorded in the
/// parse slots instead of being returned.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    Wire(WireError),
    Catalog(CatalogError),
    Replay(ReplayError),

    /// A config file could not be read or parsed.
    Config { path: String, message: String },

    /// No session with this name is loaded.
    UnknownSession { name: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(err) => write!(f, "wire error: {err}"),
            Self::Catalog(err) => write!(f, "catalog error: {err}"),
            Self::Replay(err) => write!(f, "replay error: {err}"),
            Self::Config { path, message } => write!(f, "invalid config {path}: {message}"),
            Self::UnknownSession { name } => write!(f, "no session named '{name}'"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(err) => Some(err),
            Self::Catalog(err) => Some(err),
            Self::Replay(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WireError> for SessionError {
    fn from(err: WireError) -> Self {
        Self::Wire(err)
    }
}

impl From<CatalogError> for SessionError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

impl From<ReplayError> for SessionError {
    fn from(err: ReplayError) -> Self {
        Self::Replay(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_lower_layers() {
        let err: SessionError = WireError::UnresolvedReference { ref_id: 7 }.into();
        assert!(matches!(err, SessionError::Wire(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn display_unknown_session() {
        let err = SessionError::UnknownSession {
            name: "cap 0".to_string(),
        };
        assert_eq!(err.to_string(), "no session named 'cap 0'");
    }
}
