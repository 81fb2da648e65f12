use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What remains of an attachment once its message has been sent.
///
/// The encoded payload is dropped; only display metadata is kept in the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Usage figures reported alongside an assistant answer
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl ResponseMetrics {
    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none() && self.output_tokens.is_none() && self.duration_seconds.is_none()
    }

    pub fn total_tokens(&self) -> Option<u32> {
        match (self.input_tokens, self.output_tokens) {
            (None, None) => None,
            (input, output) => Some(input.unwrap_or(0).saturating_add(output.unwrap_or(0))),
        }
    }
}

/// A single entry of the conversation log. Never mutated after it is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ResponseMetrics>,
    /// Set on assistant entries that stand in for a failed request
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    pub fn user(content: String, attachments: Vec<AttachmentMeta>) -> Self {
        Self {
            role: Role::User,
            content,
            attachments,
            metrics: None,
            is_error: false,
        }
    }

    pub fn assistant(content: String, metrics: Option<ResponseMetrics>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            attachments: Vec::new(),
            metrics: metrics.filter(|m| !m.is_empty()),
            is_error: false,
        }
    }

    pub fn assistant_error(description: impl std::fmt::Display) -> Self {
        Self {
            role: Role::Assistant,
            content: format!("Error: {}", description),
            attachments: Vec::new(),
            metrics: None,
            is_error: true,
        }
    }
}

/// Aggregated usage for a whole conversation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConversationUsage {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

impl ConversationUsage {
    pub fn from_messages(messages: &[Message]) -> Self {
        messages
            .iter()
            .filter_map(|m| m.metrics.as_ref())
            .fold(Self::default(), |mut acc, m| {
                acc.total_input_tokens += u64::from(m.input_tokens.unwrap_or(0));
                acc.total_output_tokens += u64::from(m.output_tokens.unwrap_or(0));
                acc
            })
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens + self.total_output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_drops_empty_metrics() {
        let msg = Message::assistant("Hi".to_string(), Some(ResponseMetrics::default()));
        assert!(msg.metrics.is_none());
    }

    #[test]
    fn test_assistant_error_prefix() {
        let msg = Message::assistant_error("chat endpoint returned status 502");
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.is_error);
        assert_eq!(msg.content, "Error: chat endpoint returned status 502");
    }

    #[test]
    fn test_usage_sums_partial_metrics() {
        let messages = vec![
            Message::user("a".to_string(), Vec::new()),
            Message::assistant(
                "b".to_string(),
                Some(ResponseMetrics {
                    input_tokens: Some(10),
                    output_tokens: Some(20),
                    duration_seconds: Some(0.5),
                }),
            ),
            Message::assistant(
                "c".to_string(),
                Some(ResponseMetrics {
                    input_tokens: Some(5),
                    output_tokens: None,
                    duration_seconds: None,
                }),
            ),
        ];

        let usage = ConversationUsage::from_messages(&messages);
        assert_eq!(usage.total_input_tokens, 15);
        assert_eq!(usage.total_output_tokens, 20);
        assert_eq!(usage.total_tokens(), 35);
    }

    #[test]
    fn test_total_tokens_saturates() {
        let metrics = ResponseMetrics {
            input_tokens: Some(u32::MAX),
            output_tokens: Some(5),
            duration_seconds: None,
        };
        assert_eq!(metrics.total_tokens(), Some(u32::MAX));
    }

    #[test]
    fn test_total_tokens_none_without_counts() {
        let metrics = ResponseMetrics {
            duration_seconds: Some(1.0),
            ..Default::default()
        };
        assert_eq!(metrics.total_tokens(), None);
    }
}
