//! Request composition and signing
//!
//! Builds the JSON body for `POST /api/chat` and the SHA-256 digest of the
//! exact bytes that will be sent. Optional parameters are omitted, never
//! sent as `null`, when the active model does not accept them.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::attachments::PendingAttachment;
use crate::error::ChatResult;
use crate::message::{Message, Role};
use crate::models::{ModelMetadata, ReasoningEffort};
use crate::settings::ChatSettings;

/// Header carrying the hex SHA-256 of the request body
pub const INTEGRITY_HEADER: &str = "x-integrity-digest";

/// Request parameters that only some models accept
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionalField {
    Temperature,
    ReasoningEffort,
    WebSearch,
    PreviousResponse,
}

impl OptionalField {
    pub const ALL: [OptionalField; 4] = [
        Self::Temperature,
        Self::ReasoningEffort,
        Self::WebSearch,
        Self::PreviousResponse,
    ];

    /// Capability flag that gates this field
    pub fn permitted_by(self, model: &ModelMetadata) -> bool {
        match self {
            Self::Temperature => model.supports_temperature,
            Self::ReasoningEffort => model.supports_reasoning_effort,
            Self::WebSearch => model.supports_web_search,
            Self::PreviousResponse => model.supports_previous_response,
        }
    }
}

/// Which optional fields a given model allows, evaluated once per send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldPolicy {
    included: [bool; OptionalField::ALL.len()],
}

impl FieldPolicy {
    pub fn for_model(model: &ModelMetadata) -> Self {
        Self {
            included: OptionalField::ALL.map(|field| field.permitted_by(model)),
        }
    }

    pub fn includes(&self, field: OptionalField) -> bool {
        self.included[field as usize]
    }

    fn gate<T>(&self, field: OptionalField, value: T) -> Option<T> {
        self.includes(field).then_some(value)
    }
}

/// The user turn about to be sent
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutgoingMessage {
    pub text: String,
    pub attachments: Vec<PendingAttachment>,
}

impl OutgoingMessage {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<PendingAttachment>,
}

/// Body of `POST /api/chat`
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
    pub model: String,
    pub system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_enabled: Option<bool>,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

/// Serialized body plus its integrity digest, ready to transmit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedRequest {
    pub body: Vec<u8>,
    pub digest: String,
}

/// Hex-encoded SHA-256 of `body`
pub fn integrity_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Build the request for `outgoing`.
///
/// `history` is the log before the new user message. When the model supports
/// response chaining and a token is available, only the new message is sent
/// and the server recovers context from the token; otherwise the history is
/// replayed. Error stand-ins from failed sends are never replayed.
pub fn build_request(
    history: &[Message],
    outgoing: &OutgoingMessage,
    settings: &ChatSettings,
    model: &ModelMetadata,
    previous_response_id: Option<&str>,
) -> ChatRequest {
    let policy = FieldPolicy::for_model(model);
    let chaining_token = previous_response_id.and_then(|id| policy.gate(OptionalField::PreviousResponse, id));

    let mut messages: Vec<WireMessage> = if chaining_token.is_some() {
        Vec::with_capacity(1)
    } else {
        history
            .iter()
            .filter(|m| !m.is_error)
            .map(|m| WireMessage {
                role: m.role,
                content: m.content.clone(),
                attachments: Vec::new(),
            })
            .collect()
    };

    let attachments = outgoing
        .attachments
        .iter()
        .filter(|a| {
            let ok = a.mime_matches();
            if !ok {
                warn!(name = %a.name, "Dropping attachment whose data URL does not match its type");
            }
            ok
        })
        .cloned()
        .collect();

    messages.push(WireMessage {
        role: Role::User,
        content: outgoing.text.clone(),
        attachments,
    });

    debug!(
        model = %model.id,
        message_count = messages.len(),
        chained = chaining_token.is_some(),
        "Composed chat request"
    );

    ChatRequest {
        messages,
        model: model.id.clone(),
        system_prompt: settings.system_prompt.clone(),
        temperature: policy.gate(OptionalField::Temperature, settings.temperature()),
        reasoning_effort: policy.gate(OptionalField::ReasoningEffort, settings.reasoning_effort()),
        web_search_enabled: policy.gate(OptionalField::WebSearch, settings.web_search_enabled),
        max_output_tokens: settings.max_output_tokens(),
        previous_response_id: chaining_token.map(str::to_string),
    }
}

/// Serialize `request` and sign the resulting bytes
pub fn sign_request(request: &ChatRequest) -> ChatResult<ComposedRequest> {
    let body = serde_json::to_vec(request)?;
    let digest = integrity_digest(&body);
    Ok(ComposedRequest { body, digest })
}

/// Build, serialize and sign in one step
pub fn compose(
    history: &[Message],
    outgoing: &OutgoingMessage,
    settings: &ChatSettings,
    model: &ModelMetadata,
    previous_response_id: Option<&str>,
) -> ChatResult<ComposedRequest> {
    let request = build_request(history, outgoing, settings, model, previous_response_id);
    sign_request(&request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelCatalog;
    use serde_json::Value;

    fn body_of(composed: &ComposedRequest) -> Value {
        serde_json::from_slice(&composed.body).unwrap()
    }

    fn hello() -> OutgoingMessage {
        OutgoingMessage {
            text: "Hello".to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_digest_of_known_input() {
        assert_eq!(
            integrity_digest(b"Hello, World!"),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_digest_matches_exact_body() {
        let catalog = ModelCatalog::builtin();
        let settings = ChatSettings::default();
        let composed = compose(&[], &hello(), &settings, catalog.resolve("gpt-4.1-mini"), None).unwrap();
        assert_eq!(composed.digest, integrity_digest(&composed.body));
        assert_eq!(composed.digest.len(), 64);
    }

    #[test]
    fn test_sampling_model_includes_temperature_only() {
        let catalog = ModelCatalog::builtin();
        let settings = ChatSettings::default();
        let composed = compose(&[], &hello(), &settings, catalog.resolve("gpt-4.1-mini"), None).unwrap();
        let body = body_of(&composed);

        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["temperature"], 0.7);
        assert!(body.get("reasoningEffort").is_none());
        assert_eq!(body["webSearchEnabled"], true);
        assert_eq!(body["maxOutputTokens"], 1000);
        assert_eq!(body["systemPrompt"], "");
        assert!(body.get("previousResponseId").is_none());
        assert_eq!(body["messages"], serde_json::json!([{ "role": "user", "content": "Hello" }]));
    }

    #[test]
    fn test_reasoning_model_omits_temperature() {
        let catalog = ModelCatalog::builtin();
        let settings = ChatSettings::default();
        let body = body_of(&compose(&[], &hello(), &settings, catalog.resolve("gpt-5"), None).unwrap());

        assert!(body.get("temperature").is_none());
        assert_eq!(body["reasoningEffort"], "low");
    }

    #[test]
    fn test_chaining_sends_only_new_message() {
        let catalog = ModelCatalog::builtin();
        let settings = ChatSettings::default();
        let history = vec![
            Message::user("first".to_string(), Vec::new()),
            Message::assistant("answer".to_string(), None),
        ];

        let body = body_of(
            &compose(&history, &hello(), &settings, catalog.resolve("gpt-4.1"), Some("resp_1")).unwrap(),
        );

        assert_eq!(body["previousResponseId"], "resp_1");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_model_without_chaining_replays_history_and_drops_token() {
        let catalog = ModelCatalog::builtin();
        let settings = ChatSettings::default();
        let history = vec![
            Message::user("first".to_string(), Vec::new()),
            Message::assistant("answer".to_string(), None),
            Message::user("second".to_string(), Vec::new()),
            Message::assistant_error("chat endpoint returned status 502"),
        ];

        let model = catalog.resolve("global.anthropic.claude-sonnet-4-6");
        let body = body_of(&compose(&history, &hello(), &settings, model, Some("resp_1")).unwrap());

        assert!(body.get("previousResponseId").is_none());
        assert!(body.get("webSearchEnabled").is_none());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[3]["content"], "Hello");
    }

    #[test]
    fn test_attachments_serialized_on_new_message() {
        let catalog = ModelCatalog::builtin();
        let settings = ChatSettings::default();
        let outgoing = OutgoingMessage {
            text: String::new(),
            attachments: vec![PendingAttachment {
                name: "a.png".to_string(),
                mime_type: "image/png".to_string(),
                data_url: "data:image/png;base64,AA==".to_string(),
                size_bytes: 1,
            }],
        };

        let body = body_of(&compose(&[], &outgoing, &settings, catalog.first(), None).unwrap());
        assert_eq!(
            body["messages"][0]["attachments"],
            serde_json::json!([{
                "name": "a.png",
                "mimeType": "image/png",
                "dataUrl": "data:image/png;base64,AA=="
            }])
        );
    }

    #[test]
    fn test_field_policy_matches_flags() {
        let catalog = ModelCatalog::builtin();
        let policy = FieldPolicy::for_model(catalog.resolve("global.anthropic.claude-opus-4-6-v1"));
        assert!(policy.includes(OptionalField::Temperature));
        assert!(!policy.includes(OptionalField::ReasoningEffort));
        assert!(!policy.includes(OptionalField::WebSearch));
        assert!(!policy.includes(OptionalField::PreviousResponse));
    }

    #[test]
    fn test_outgoing_is_empty() {
        assert!(OutgoingMessage::default().is_empty());
        assert!(
            OutgoingMessage {
                text: "   ".to_string(),
                attachments: Vec::new()
            }
            .is_empty()
        );
        assert!(!hello().is_empty());
    }
}
