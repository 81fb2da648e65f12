use thiserror::Error;

/// Failure of a single request to the chat endpoint.
///
/// Every variant is recoverable from the session's point of view: the
/// controller turns it into an assistant-role error entry and returns to idle.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("chat endpoint returned status {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("failed to serialize request: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ChatError::Malformed(e.to_string())
        } else {
            ChatError::Http(e.to_string())
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Reason a selected file did not become a pending attachment.
///
/// The `Display` text is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("You can attach up to {max} files per message; {dropped} file(s) were not added.")]
    TooMany { max: usize, dropped: usize },

    #[error("{name}: unsupported file type ({mime_type}). Only PDF, PNG, JPEG, WEBP and GIF are allowed.")]
    UnsupportedType { name: String, mime_type: String },

    #[error("{name}: file is too large ({size} bytes, limit is {max} bytes).")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("Total attachment size would exceed {max} bytes; {dropped} file(s) were not added.")]
    TotalTooLarge { max: u64, dropped: usize },

    #[error("Failed to read {failed} file(s).")]
    DecodeFailed { failed: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_includes_detail_when_present() {
        let err = ChatError::Status {
            status: 400,
            detail: Some("Unsupported model: foo".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "chat endpoint returned status 400: Unsupported model: foo"
        );

        let err = ChatError::Status {
            status: 502,
            detail: None,
        };
        assert_eq!(err.to_string(), "chat endpoint returned status 502");
    }

    #[test]
    fn test_attachment_error_messages_are_user_facing() {
        let err = AttachmentError::TooMany { max: 4, dropped: 2 };
        assert!(err.to_string().contains("up to 4 files"));

        let err = AttachmentError::UnsupportedType {
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
        };
        assert!(err.to_string().starts_with("notes.txt: unsupported file type"));
    }
}
