//! services/api/src/adapters/generation_llm.rs
//!
//! This module contains the adapter for the response-generating LLM.
//! It implements the `GenerationBackend` port from the `core` crate.

const SUPPORT_INSTRUCTIONS: &str = r#"You are a compassionate mental-health support companion.

Your role:
- Listen first. Acknowledge what the user is feeling before anything else.
- Be warm and conversational, never clinical or preachy.
- Offer gentle, practical suggestions only when they fit the conversation.
- Never diagnose, never prescribe, never promise outcomes.
- If the user mentions professional help, encourage it supportively.

Style:
- A few sentences, the length of a caring text message from a friend.
- Use contractions and plain language; avoid lists and headers.
- Ask at most one gentle follow-up question."#;

const CRISIS_INSTRUCTIONS: &str = r#"You are a mental-health support companion and the current message suggests the user may be in acute distress or at risk of self-harm.

Your role:
- Respond with immediate warmth and without judgment.
- Take what they said seriously; do not minimize or change the subject.
- Encourage them to reach out right now to someone they trust or to a crisis line (for example, the 988 Suicide & Crisis Lifeline if they are in the US).
- Keep the reply short, direct and caring. No lists, no lectures.
- Never suggest that you can keep them safe yourself."#;

const RECOMMENDATION_INSTRUCTIONS: &str = r#"You are a mental-health support companion and the user is asking for suggestions.

Your role:
- Acknowledge how they are feeling first.
- Offer one or two small, concrete activities suited to their state (a short walk, a breathing exercise, writing things down, reaching out to a friend).
- Frame suggestions as invitations, not instructions.
- Keep it to a few conversational sentences."#;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

use wellmind_core::domain::{
    AssessmentKind, AssessmentScore, ChatMessage, GenerationContext, GenerationReply, SafetyCheck,
    Sender,
};
use wellmind_core::ports::{GenerationBackend, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerationBackend` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGenerationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerationAdapter {
    /// Creates a new `OpenAiGenerationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn instructions_for(conversation_type: &str) -> &'static str {
        match conversation_type {
            "crisis" => CRISIS_INSTRUCTIONS,
            "recommendation_request" => RECOMMENDATION_INSTRUCTIONS,
            _ => SUPPORT_INSTRUCTIONS,
        }
    }

    /// Renders the rolling context into a short system-prompt suffix.
    fn context_block(context: &GenerationContext) -> String {
        let mut block = String::new();
        if let Some(sentiment) = &context.sentiment {
            block.push_str(&format!(
                "\n\nCurrent analysis: the user's sentiment reads as {} (risk level {:?}).",
                sentiment.label, sentiment.risk_level
            ));
        }
        if let Some(intent) = &context.intent {
            block.push_str(&format!(" Detected intent: {}.", intent.primary_intent));
        }
        if !context.current_challenges.is_empty() {
            block.push_str(&format!(
                " Recurring themes this session: {}.",
                context.current_challenges.join(", ")
            ));
        }
        if !context.goals.is_empty() {
            block.push_str(&format!(
                " Goals the user has mentioned: {}.",
                context.goals.join(", ")
            ));
        }
        block
    }
}

//=========================================================================================
// `GenerationBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerationBackend for OpenAiGenerationAdapter {
    async fn respond(
        &self,
        user_message: &str,
        history: &[ChatMessage],
        context: &GenerationContext,
        conversation_type: &str,
    ) -> PortResult<GenerationReply> {
        let system_prompt = format!(
            "{}{}",
            Self::instructions_for(conversation_type),
            Self::context_block(context)
        );

        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];
        for turn in history {
            let message = match turn.sender {
                Sender::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.text.clone())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
                Sender::Bot => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.text.clone())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            };
            messages.push(message);
        }
        // The current user message is the last history entry only if the
        // caller appended it before generating; make sure it is present.
        let ends_with_user_message = history
            .last()
            .map(|m| m.sender == Sender::User && m.text == user_message)
            .unwrap_or(false);
        if !ends_with_user_message {
            messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message.to_string())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            );
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Generation LLM response contained no text content.".to_string())
            })?;

        Ok(GenerationReply {
            response_text: content,
            safety_check: SafetyCheck {
                is_safe: true,
                confidence: 1.0,
            },
        })
    }

    async fn assessment_questions(&self, kind: AssessmentKind) -> PortResult<Vec<String>> {
        // The standard instruments are fixed questionnaires; there is nothing
        // for the model to generate here.
        Ok(kind.default_questions())
    }

    async fn score_assessment(
        &self,
        kind: AssessmentKind,
        responses: &BTreeMap<String, u8>,
    ) -> PortResult<AssessmentScore> {
        Ok(AssessmentScore::compute(kind, responses))
    }
}
