// ABOUTME: Chat request domain types shared by validation, prompt assembly, and the provider adapter
// ABOUTME: Defines conversation contexts, history entries, per-request overrides, and generation params
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::groq::{MAX_TOKENS_RANGE, TEMPERATURE_RANGE};
use crate::config::GroqConfig;

/// Topic of the conversation, selecting a system prompt fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatContext {
    #[default]
    /// Open questions about the program
    GeneralInquiry,
    /// Curriculum and schedule
    CourseInformation,
    /// Admissions and sign-up
    Enrollment,
    /// Tuition and payment options
    Pricing,
    /// Job outcomes and career paths
    CareerGuidance,
    /// Platform and tooling problems
    TechnicalSupport,
}

impl ChatContext {
    /// Every context tag
    pub const ALL: [Self; 6] = [
        Self::GeneralInquiry,
        Self::CourseInformation,
        Self::Enrollment,
        Self::Pricing,
        Self::CareerGuidance,
        Self::TechnicalSupport,
    ];

    /// Wire tag, e.g. `general-inquiry`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GeneralInquiry => "general-inquiry",
            Self::CourseInformation => "course-information",
            Self::Enrollment => "enrollment",
            Self::Pricing => "pricing",
            Self::CareerGuidance => "career-guidance",
            Self::TechnicalSupport => "technical-support",
        }
    }

    /// Look up a context by its wire tag
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == tag)
    }
}

impl fmt::Display for ChatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    /// Learner turn
    User,
    /// Earlier model reply
    Assistant,
    /// Instruction turn
    System,
}

impl HistoryRole {
    /// Parse a wire role name
    #[must_use]
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// One prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Who wrote the turn
    pub role: HistoryRole,
    /// Turn text
    pub content: String,
}

/// Optional generation overrides supplied with a request
///
/// Values are captured as given; [`GenerationParams::resolve`] decides which
/// ones are acceptable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOverrides {
    /// Requested model id
    pub model: Option<String>,
    /// Requested sampling temperature
    pub temperature: Option<f64>,
    /// Requested completion token cap
    pub max_tokens: Option<u64>,
    /// Override keys present with a value of the wrong type
    pub malformed: Vec<&'static str>,
}

impl RequestOverrides {
    /// Read `model`, `temperature`, and `maxTokens` from a request `config` object
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut overrides = Self::default();
        let Some(map) = value.as_object() else {
            overrides.malformed.push("config");
            return overrides;
        };

        if let Some(model) = map.get("model") {
            match model.as_str() {
                Some(m) => overrides.model = Some(m.to_owned()),
                None => overrides.malformed.push("model"),
            }
        }
        if let Some(temperature) = map.get("temperature") {
            match temperature.as_f64() {
                Some(t) => overrides.temperature = Some(t),
                None => overrides.malformed.push("temperature"),
            }
        }
        if let Some(max_tokens) = map.get("maxTokens") {
            match max_tokens.as_u64() {
                Some(n) => overrides.max_tokens = Some(n),
                None => overrides.malformed.push("maxTokens"),
            }
        }
        overrides
    }
}

/// Validated, sanitized chat request ready for the provider adapter
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedChatRequest {
    /// Sanitized user message, never empty
    pub message: String,
    /// Structurally valid history entries, oldest first
    pub conversation_history: Vec<HistoryMessage>,
    /// Conversation topic
    pub context: ChatContext,
    /// Generation overrides as supplied
    pub overrides: RequestOverrides,
}

/// Model and sampling parameters for one upstream call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Model id sent upstream
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Completion token cap
    pub max_tokens: u32,
}

impl GenerationParams {
    /// Configured values with any acceptable overrides applied
    ///
    /// Returns the parameters and the names of overrides that were ignored.
    #[must_use]
    pub fn resolve(config: &GroqConfig, overrides: &RequestOverrides) -> (Self, Vec<&'static str>) {
        let mut ignored = overrides.malformed.clone();
        let mut params = Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        if let Some(model) = &overrides.model {
            if GroqConfig::is_supported_model(model) {
                params.model.clone_from(model);
            } else {
                ignored.push("model");
            }
        }

        if let Some(temperature) = overrides.temperature {
            let (min, max) = TEMPERATURE_RANGE;
            if (min..=max).contains(&temperature) {
                params.temperature = temperature;
            } else {
                ignored.push("temperature");
            }
        }

        if let Some(max_tokens) = overrides.max_tokens {
            let (min, max) = MAX_TOKENS_RANGE;
            match u32::try_from(max_tokens) {
                Ok(n) if (min..=max).contains(&n) => params.max_tokens = n,
                _ => ignored.push("maxTokens"),
            }
        }

        (params, ignored)
    }
}
