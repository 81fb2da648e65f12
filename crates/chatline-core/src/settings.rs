//! User-adjustable request settings.
//!
//! Numeric values are clamped when they are edited, so a `ChatSettings` value
//! is always within range by the time a request is composed.

use tracing::debug;

use crate::models::{DEFAULT_MODEL, ReasoningEffort};

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

pub const MIN_OUTPUT_TOKENS: u32 = 1;
pub const MAX_OUTPUT_TOKENS: u32 = 4096;
pub const DEFAULT_OUTPUT_TOKENS: u32 = 1000;

#[derive(Clone, Debug, PartialEq)]
pub struct ChatSettings {
    pub(crate) model: String,
    pub system_prompt: String,
    temperature: f64,
    pub(crate) reasoning_effort: ReasoningEffort,
    max_output_tokens: u32,
    pub web_search_enabled: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            reasoning_effort: ReasoningEffort::Low,
            max_output_tokens: DEFAULT_OUTPUT_TOKENS,
            web_search_enabled: true,
        }
    }
}

impl ChatSettings {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn reasoning_effort(&self) -> ReasoningEffort {
        self.reasoning_effort
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    /// Apply an edited temperature. Non-finite input leaves the current value.
    pub fn set_temperature(&mut self, value: f64) {
        if !value.is_finite() {
            debug!(value, "Ignoring non-finite temperature");
            return;
        }
        self.temperature = value.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE);
    }

    /// Apply an edited token limit. Fractions are rounded; non-finite input is ignored.
    pub fn set_max_output_tokens(&mut self, value: f64) {
        if !value.is_finite() {
            debug!(value, "Ignoring non-finite max output tokens");
            return;
        }
        let clamped = value
            .round()
            .clamp(f64::from(MIN_OUTPUT_TOKENS), f64::from(MAX_OUTPUT_TOKENS));
        self.max_output_tokens = clamped as u32;
    }

    /// Apply raw text from an input field. Returns whether the value was accepted.
    pub fn set_temperature_input(&mut self, raw: &str) -> bool {
        match parse_finite(raw) {
            Some(value) => {
                self.set_temperature(value);
                true
            }
            None => false,
        }
    }

    pub fn set_max_output_tokens_input(&mut self, raw: &str) -> bool {
        match parse_finite(raw) {
            Some(value) => {
                self.set_max_output_tokens(value);
                true
            }
            None => false,
        }
    }

    /// Set the effort level unchecked. Callers outside the crate go through
    /// `ChatSession::set_reasoning_effort`, which validates against the model.
    pub(crate) fn set_reasoning_effort(&mut self, effort: ReasoningEffort) {
        self.reasoning_effort = effort;
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
