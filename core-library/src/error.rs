use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// The caller supplied a genre or song that cannot be stored.
    #[error("Invalid input: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    /// A bucket value exists but is not a JSON array of songs.
    #[error("Corrupt genre bucket '{key}': {source}")]
    CorruptBucket {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode genre bucket '{key}': {source}")]
    Encoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification used by hosts to pick a message and a recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller error; retrying with the same input fails again.
    Validation,
    /// The backing store failed or holds unreadable data.
    Storage,
}

impl LibraryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            LibraryError::Validation { .. } => ErrorCategory::Validation,
            LibraryError::Storage(_)
            | LibraryError::CorruptBucket { .. }
            | LibraryError::Encoding { .. } => ErrorCategory::Storage,
        }
    }

    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            LibraryError::Validation { field, .. } if field == "genre" => {
                "Please enter a genre before saving.".to_string()
            }
            LibraryError::Validation { field, .. } if field == "title" => {
                "This song has no title and cannot be saved.".to_string()
            }
            LibraryError::Validation { field, .. } if field == "artist" => {
                "This song has no artist and cannot be saved.".to_string()
            }
            LibraryError::Validation { message, .. } => message.clone(),
            LibraryError::Storage(BridgeError::QuotaExceeded { .. }) => {
                "Your device is out of space. Free some storage and try again.".to_string()
            }
            LibraryError::Storage(_) => {
                "Your library could not be accessed. Please try again.".to_string()
            }
            LibraryError::CorruptBucket { .. } | LibraryError::Encoding { .. } => {
                "Some saved songs could not be read.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            LibraryError::validation("genre", "blank").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            LibraryError::from(BridgeError::OperationFailed("disk".into())).category(),
            ErrorCategory::Storage
        );

        let source = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let corrupt = LibraryError::CorruptBucket {
            key: "@genre_rock".into(),
            source,
        };
        assert_eq!(corrupt.category(), ErrorCategory::Storage);
        assert!(corrupt.to_string().contains("@genre_rock"));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let messages = [
            LibraryError::validation("genre", "blank").user_message(),
            LibraryError::validation("title", "blank").user_message(),
            LibraryError::from(BridgeError::DatabaseError("locked".into())).user_message(),
            LibraryError::from(BridgeError::QuotaExceeded {
                key: "@genre_rock".into(),
            })
            .user_message(),
        ];

        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
