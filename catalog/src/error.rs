//! Catalog and codec errors.

use std::fmt;

use cursor::CursorError;

/// Result type for catalog and codec operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while loading protocol definitions or running codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    /// Reading a definition file failed.
    Io { path: String, message: String },

    /// A definition file was not valid JSON for its expected shape.
    Json { path: String, message: String },

    /// A glob pattern could not be compiled or walked.
    Glob { pattern: String, message: String },

    /// No patch matches the selected build name.
    UnknownBuild { name: String },

    /// A patch references a protocol version with no definition file.
    MissingProtocol { kind: &'static str, version: u16 },

    /// Two codecs were registered for the same key.
    DuplicateCodec { key: String },

    /// A schema definition is inconsistent.
    InvalidSchema { message: String, reason: String },

    /// A packed field value does not match the field's declared kind.
    FieldMismatch { field: String },

    /// A codec was asked to pack before it held any values.
    NotUnpacked,

    /// Unpacking or packing ran out of bytes.
    Cursor(CursorError),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "failed to read {path}: {message}"),
            Self::Json { path, message } => write!(f, "invalid definition {path}: {message}"),
            Self::Glob { pattern, message } => write!(f, "bad pattern {pattern}: {message}"),
            Self::UnknownBuild { name } => write!(f, "no patch named '{name}'"),
            Self::MissingProtocol { kind, version } => {
                write!(f, "missing {kind} protocol definition for version {version}")
            }
            Self::DuplicateCodec { key } => write!(f, "codec already registered for {key}"),
            Self::InvalidSchema { message, reason } => {
                write!(f, "invalid schema for {message}: {reason}")
            }
            Self::FieldMismatch { field } => {
                write!(f, "value for field '{field}' does not match its kind")
            }
            Self::NotUnpacked => write!(f, "codec holds no values to pack"),
            Self::Cursor(err) => write!(f, "cursor error: {err}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cursor(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CursorError> for CatalogError {
    fn from(err: CursorError) -> Self {
        Self::Cursor(err)
    }
}
