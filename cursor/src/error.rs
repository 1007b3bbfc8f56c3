//! Error types for cursor operations.

use std::fmt;

/// Result type for cursor operations.
pub type CursorResult<T> = Result<T, CursorError>;

/// Errors that can occur while reading or writing through a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// A read or write would run past the end of the buffer.
    OutOfBounds {
        /// Cursor position at the time of the access.
        offset: usize,
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes left in the buffer.
        available: usize,
    },

    /// A NUL-terminated string had no terminator before the end of the buffer.
    UnterminatedString {
        /// Position where the string started.
        offset: usize,
    },

    /// A length does not fit in the prefix width used by the encoding.
    LengthOverflow {
        /// The length that was attempted.
        length: usize,
        /// Largest representable length.
        max: usize,
    },
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                offset,
                requested,
                available,
            } => {
                write!(
                    f,
                    "out of bounds at offset {offset}: requested {requested} bytes but only {available} available"
                )
            }
            Self::UnterminatedString { offset } => {
                write!(f, "unterminated string starting at offset {offset}")
            }
            Self::LengthOverflow { length, max } => {
                write!(f, "length {length} exceeds maximum {max}")
            }
        }
    }
}

impl std::error::Error for CursorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_out_of_bounds() {
        let err = CursorError::OutOfBounds {
            offset: 12,
            requested: 8,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("offset 12"), "should mention the offset");
        assert!(msg.contains("8 bytes"), "should mention requested bytes");
        assert!(msg.contains("3 available"), "should mention available bytes");
    }

    #[test]
    fn error_display_unterminated() {
        let err = CursorError::UnterminatedString { offset: 40 };
        assert!(err.to_string().contains("40"));
    }

    #[test]
    fn error_display_length_overflow() {
        let err = CursorError::LengthOverflow {
            length: 70_000,
            max: 65_535,
        };
        let msg = err.to_string();
        assert!(msg.contains("70000"));
        assert!(msg.contains("65535"));
    }

    #[test]
    fn error_equality() {
        let a = CursorError::OutOfBounds {
            offset: 0,
            requested: 4,
            available: 2,
        };
        let b = a.clone();
        let c = CursorError::OutOfBounds {
            offset: 0,
            requested: 4,
            available: 1,
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn error_is_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<CursorError>();
    }
}
