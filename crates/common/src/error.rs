//! Error types shared across Reelcut crates.

/// Top-level error type for Reelcut operations.
///
/// The first four variants mirror how a render request can fail from the
/// caller's point of view: rejected before scheduling (`Validation`,
/// `Conflict`, `NotFound`) or failed while running (`Execution`).
#[derive(Debug, thiserror::Error)]
pub enum ReelcutError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Execution error: {message}")]
    Execution { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using ReelcutError.
pub type ReelcutResult<T> = Result<T, ReelcutError>;

/// Coarse classification of an error, used by outer surfaces to pick an
/// exit code or response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Execution,
    Internal,
}

impl ReelcutError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict {
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
        }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Classify this error.
    ///
    /// Filesystem and engine failures that surface inside a running job are
    /// execution errors; a missing file reported before scheduling is a
    /// validation error and is constructed as such by the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Execution { .. } | Self::Io(_) => ErrorKind::Execution,
            Self::Store { .. } | Self::Unsupported { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the request was rejected before any work was scheduled.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::Conflict | ErrorKind::NotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ReelcutError::validation("no source").kind(),
            ErrorKind::Validation
        );
        assert_eq!(ReelcutError::conflict("busy").kind(), ErrorKind::Conflict);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "seg_000.mp4");
        assert_eq!(ReelcutError::from(io).kind(), ErrorKind::Execution);
        assert_eq!(ReelcutError::store("disk").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_rejections() {
        assert!(ReelcutError::conflict("busy").is_rejection());
        assert!(ReelcutError::not_found("project 7").is_rejection());
        assert!(!ReelcutError::execution("ffmpeg exited 1").is_rejection());
    }

    #[test]
    fn test_display_includes_message() {
        let err = ReelcutError::execution("ffmpeg exited with status 1");
        assert_eq!(
            err.to_string(),
            "Execution error: ffmpeg exited with status 1"
        );
    }
}
