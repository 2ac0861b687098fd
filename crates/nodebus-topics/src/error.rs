//! # Topic Errors

use thiserror::Error;

/// Errors from topic lookup and registration.
///
/// Both variants are programmer errors: they are returned rather than
/// panicking so the caller decides how loudly to fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// A topic name was reused with a different payload type.
    #[error("Topic '{topic}' carries {found}, but was requested as {expected}")]
    TypeMismatch {
        topic: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Topic names must be non-empty.
    #[error("Invalid topic name: {0:?}")]
    InvalidName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = TopicError::TypeMismatch {
            topic: "speed".to_string(),
            expected: "f32",
            found: "i32",
        };
        assert_eq!(
            err.to_string(),
            "Topic 'speed' carries i32, but was requested as f32"
        );
    }
}
