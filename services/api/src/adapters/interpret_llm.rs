//! services/api/src/adapters/interpret_llm.rs
//!
//! This module contains the adapter for the dream-interpreting LLM.
//! It implements the `DreamInterpretationService` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = "You are a dream analyst with expertise in Jungian psychology, symbolism, and subconscious interpretation. \
Analyze the provided dream description thoughtfully and provide both a narrative interpretation \
and structured insights. Be introspective, insightful, and avoid cliches. \
Your response should be in JSON format with exactly two top-level fields: \
1. 'interpretation': A 3-4 paragraph analysis that explores potential meanings \
2. 'insights': An object with three arrays of short strings: 'symbols', 'emotions', and 'themes'";

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use dream_journal_core::{
    domain::{DreamAnalysis, Insights},
    ports::{DreamInterpretationService, PortError, PortResult},
};
use serde::Deserialize;
use tracing::error;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DreamInterpretationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiInterpretationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiInterpretationAdapter {
    /// Creates a new `OpenAiInterpretationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// Response Parsing
//=========================================================================================

#[derive(Deserialize)]
struct RawAnalysis {
    interpretation: Option<String>,
    insights: Option<RawInsights>,
}

#[derive(Deserialize, Default)]
struct RawInsights {
    symbols: Option<Vec<String>>,
    emotions: Option<Vec<String>>,
    themes: Option<Vec<String>>,
}

/// Parses the model's JSON answer. A missing or null insight array becomes empty;
/// a missing interpretation or non-JSON output is an error.
pub fn parse_analysis(raw: &str) -> PortResult<DreamAnalysis> {
    let parsed: RawAnalysis = serde_json::from_str(raw)
        .map_err(|e| PortError::Interpretation(format!("response was not the expected JSON: {}", e)))?;

    let interpretation = parsed
        .interpretation
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| PortError::Interpretation("response had no interpretation".to_string()))?;

    let insights = parsed.insights.unwrap_or_default();
    Ok(DreamAnalysis {
        interpretation,
        insights: Insights {
            symbols: insights.symbols.unwrap_or_default(),
            emotions: insights.emotions.unwrap_or_default(),
            themes: insights.themes.unwrap_or_default(),
        },
    })
}

//=========================================================================================
// `DreamInterpretationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DreamInterpretationService for OpenAiInterpretationAdapter {
    /// Asks the model for a JSON object holding the interpretation and its insights.
    async fn interpret(&self, dream_text: &str) -> PortResult<DreamAnalysis> {
        if dream_text.trim().is_empty() {
            return Err(PortError::InvalidInput("dream text is empty".to_string()));
        }

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Interpretation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(dream_text)
                .build()
                .map_err(|e| PortError::Interpretation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .n(1)
            .build()
            .map_err(|e| PortError::Interpretation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| {
                error!("Error interpreting dream: {}", e);
                PortError::Interpretation(e.to_string())
            })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Interpretation("Interpretation LLM returned no text content.".to_string())
            })?;

        parse_analysis(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_response() {
        let raw = r#"{
            "interpretation": "Flying suggests a desire for freedom.",
            "insights": {"symbols": ["sky"], "emotions": ["joy"], "themes": ["freedom"]}
        }"#;
        let analysis = parse_analysis(raw).unwrap();
        assert_eq!(analysis.interpretation, "Flying suggests a desire for freedom.");
        assert_eq!(analysis.insights.symbols, vec!["sky".to_string()]);
        assert_eq!(analysis.insights.themes, vec!["freedom".to_string()]);
    }

    #[test]
    fn missing_or_null_insight_arrays_become_empty() {
        let raw = r#"{"interpretation": "text", "insights": {"symbols": null, "themes": ["loss"]}}"#;
        let analysis = parse_analysis(raw).unwrap();
        assert!(analysis.insights.symbols.is_empty());
        assert!(analysis.insights.emotions.is_empty());
        assert_eq!(analysis.insights.themes, vec!["loss".to_string()]);

        let analysis = parse_analysis(r#"{"interpretation": "text"}"#).unwrap();
        assert_eq!(analysis.insights, Insights::default());
    }

    #[test]
    fn rejects_unparseable_output() {
        assert!(matches!(
            parse_analysis("Here is your interpretation!"),
            Err(PortError::Interpretation(_))
        ));
        assert!(matches!(
            parse_analysis(r#"{"insights": {}}"#),
            Err(PortError::Interpretation(_))
        ));
    }
}
