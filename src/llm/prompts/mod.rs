// ABOUTME: System prompts for the course advisor loaded at compile time
// ABOUTME: Combines the base prompt with a context fragment and assembles the message list
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # System Prompts
//!
//! Prompts are loaded at compile time from markdown files for easy maintenance.

use super::ChatMessage;
use crate::models::{ChatContext, NormalizedChatRequest};

/// Base course advisor prompt shared by every conversation
pub const BASE_SYSTEM_PROMPT: &str = include_str!("base.md");

const GENERAL_INQUIRY: &str = include_str!("contexts/general_inquiry.md");
const COURSE_INFORMATION: &str = include_str!("contexts/course_information.md");
const ENROLLMENT: &str = include_str!("contexts/enrollment.md");
const PRICING: &str = include_str!("contexts/pricing.md");
const CAREER_GUIDANCE: &str = include_str!("contexts/career_guidance.md");
const TECHNICAL_SUPPORT: &str = include_str!("contexts/technical_support.md");

/// Prompt fragment for a conversation context
#[must_use]
pub const fn context_prompt(context: ChatContext) -> &'static str {
    match context {
        ChatContext::GeneralInquiry => GENERAL_INQUIRY,
        ChatContext::CourseInformation => COURSE_INFORMATION,
        ChatContext::Enrollment => ENROLLMENT,
        ChatContext::Pricing => PRICING,
        ChatContext::CareerGuidance => CAREER_GUIDANCE,
        ChatContext::TechnicalSupport => TECHNICAL_SUPPORT,
    }
}

/// Base prompt followed by the context fragment
#[must_use]
pub fn system_prompt(context: ChatContext) -> String {
    format!(
        "{}\n\n{}",
        BASE_SYSTEM_PROMPT.trim_end(),
        context_prompt(context).trim_end()
    )
}

/// System prompt, then history in order, then the new user message
#[must_use]
pub fn build_messages(request: &NormalizedChatRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.conversation_history.len() + 2);
    messages.push(ChatMessage::system(system_prompt(request.context)));
    messages.extend(
        request
            .conversation_history
            .iter()
            .map(|entry| ChatMessage::new(entry.role.into(), entry.content.clone())),
    );
    messages.push(ChatMessage::user(request.message.clone()));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use crate::models::{HistoryMessage, HistoryRole, RequestOverrides};

    #[test]
    fn test_every_context_has_a_distinct_fragment() {
        let mut seen = std::collections::HashSet::new();
        for context in ChatContext::ALL {
            let fragment = context_prompt(context);
            assert!(fragment.starts_with("## Current focus"));
            assert!(seen.insert(fragment));
        }
    }

    #[test]
    fn test_system_prompt_appends_fragment_to_base() {
        let prompt = system_prompt(ChatContext::Pricing);
        assert!(prompt.starts_with("# Course Advisor"));
        assert!(prompt.ends_with(PRICING.trim_end()));
    }

    #[test]
    fn test_messages_are_ordered() {
        let request = NormalizedChatRequest {
            message: "And the price?".to_owned(),
            conversation_history: vec![
                HistoryMessage {
                    role: HistoryRole::User,
                    content: "What is taught?".to_owned(),
                },
                HistoryMessage {
                    role: HistoryRole::Assistant,
                    content: "Web and backend.".to_owned(),
                },
            ],
            context: ChatContext::Pricing,
            overrides: RequestOverrides::default(),
        };

        let messages = build_messages(&request);
        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(messages[3].content, "And the price?");
    }
}
