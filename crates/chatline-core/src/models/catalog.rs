use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model used when nothing else has been selected
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub const ALL: [ReasoningEffort; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown reasoning effort: {}", other)),
        }
    }
}

/// Capability record for one model, as served by `GET /api/models`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub id: String,
    pub supports_temperature: bool,
    pub supports_reasoning_effort: bool,
    #[serde(default)]
    pub reasoning_effort_options: Vec<ReasoningEffort>,
    #[serde(default)]
    pub default_reasoning_effort: Option<ReasoningEffort>,
    #[serde(default = "default_true")]
    pub supports_web_search: bool,
    #[serde(default = "default_true")]
    pub supports_previous_response: bool,
}

fn default_true() -> bool {
    true
}

impl ModelMetadata {
    fn openai_sampling(id: &str) -> Self {
        Self {
            id: id.to_string(),
            supports_temperature: true,
            supports_reasoning_effort: false,
            reasoning_effort_options: Vec::new(),
            default_reasoning_effort: None,
            supports_web_search: true,
            supports_previous_response: true,
        }
    }

    fn openai_reasoning(id: &str) -> Self {
        Self {
            id: id.to_string(),
            supports_temperature: false,
            supports_reasoning_effort: true,
            reasoning_effort_options: ReasoningEffort::ALL.to_vec(),
            default_reasoning_effort: Some(ReasoningEffort::Low),
            supports_web_search: true,
            supports_previous_response: true,
        }
    }

    fn bedrock(id: &str) -> Self {
        Self {
            id: id.to_string(),
            supports_temperature: true,
            supports_reasoning_effort: false,
            reasoning_effort_options: Vec::new(),
            default_reasoning_effort: None,
            supports_web_search: false,
            supports_previous_response: false,
        }
    }

    /// Effort to fall back to when the configured one is not accepted
    pub fn fallback_reasoning_effort(&self) -> Option<ReasoningEffort> {
        self.default_reasoning_effort
            .or_else(|| self.reasoning_effort_options.first().copied())
    }
}

/// The set of models the session may select from
#[derive(Clone, Debug, PartialEq)]
pub struct ModelCatalog {
    models: Vec<ModelMetadata>,
}

impl ModelCatalog {
    /// Catalog compiled into the binary; always available without a network call
    pub fn builtin() -> Self {
        let mut models = vec![
            ModelMetadata::openai_sampling("gpt-4.1"),
            ModelMetadata::openai_sampling("gpt-4.1-mini"),
        ];
        models.extend(
            [
                "gpt-5",
                "gpt-5-mini",
                "gpt-5-nano",
                "gpt-5-chat-latest",
                "gpt-5.2",
                "gpt-5.2-pro",
                "o4-mini",
                "o3-deep-research",
                "o4-mini-deep-research",
            ]
            .into_iter()
            .map(ModelMetadata::openai_reasoning),
        );
        models.extend(
            [
                "global.anthropic.claude-opus-4-6-v1",
                "global.anthropic.claude-sonnet-4-6",
                "global.anthropic.claude-haiku-4-5-20251001-v1:0",
            ]
            .into_iter()
            .map(ModelMetadata::bedrock),
        );

        Self { models }
    }

    /// Build a catalog from fetched entries. Returns `None` for an empty list,
    /// since an empty catalog cannot satisfy the active-model invariant.
    pub fn from_models(models: Vec<ModelMetadata>) -> Option<Self> {
        if models.is_empty() {
            None
        } else {
            Some(Self { models })
        }
    }

    pub fn get(&self, id: &str) -> Option<&ModelMetadata> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn first(&self) -> &ModelMetadata {
        // Constructors reject empty lists
        &self.models[0]
    }

    /// Resolve an id, falling back to the first entry when it is unknown
    pub fn resolve(&self, id: &str) -> &ModelMetadata {
        self.get(id).unwrap_or_else(|| self.first())
    }

    pub fn models(&self) -> &[ModelMetadata] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
