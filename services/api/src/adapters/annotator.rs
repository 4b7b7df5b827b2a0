//! services/api/src/adapters/annotator.rs
//!
//! Keyword-based title and tag derivation. Implements `DreamAnnotationService`
//! so a model-backed annotator can be dropped in later.

use async_trait::async_trait;
use dream_journal_core::ports::{DreamAnnotationService, PortResult};

/// Dream themes recognized by substring match against the lowercased text.
pub const THEME_VOCABULARY: [&str; 11] = [
    "flying", "falling", "chase", "water", "family", "lost", "animals", "school", "work",
    "test", "nightmare",
];

/// Assigned when no theme matches.
pub const DEFAULT_TAG: &str = "miscellaneous";

const TITLE_WORDS: usize = 5;
const UNTITLED: &str = "Untitled Dream";

#[derive(Clone, Debug, Default)]
pub struct KeywordAnnotator;

impl KeywordAnnotator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DreamAnnotationService for KeywordAnnotator {
    /// Uses the opening words of the dream as its title. The ellipsis marks
    /// truncation only, so a short dream keeps its full text as the title.
    async fn suggest_title(&self, dream_text: &str) -> PortResult<String> {
        let words: Vec<&str> = dream_text.split_whitespace().collect();
        if words.is_empty() {
            return Ok(UNTITLED.to_string());
        }

        let mut title = words[..words.len().min(TITLE_WORDS)].join(" ");
        if words.len() > TITLE_WORDS {
            title.push_str("...");
        }
        Ok(title)
    }

    async fn extract_tags(&self, dream_text: &str) -> PortResult<Vec<String>> {
        let lowered = dream_text.to_lowercase();
        let mut tags: Vec<String> = THEME_VOCABULARY
            .iter()
            .filter(|theme| lowered.contains(*theme))
            .map(|theme| theme.to_string())
            .collect();

        if tags.is_empty() {
            tags.push(DEFAULT_TAG.to_string());
        }
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tags_come_from_the_theme_vocabulary() {
        let tags = KeywordAnnotator
            .extract_tags("I was Flying over WATER when my family called")
            .await
            .unwrap();
        assert_eq!(tags, vec!["flying", "water", "family"]);
    }

    #[tokio::test]
    async fn unmatched_text_gets_the_default_tag() {
        let tags = KeywordAnnotator.extract_tags("A quiet garden.").await.unwrap();
        assert_eq!(tags, vec![DEFAULT_TAG]);
    }

    #[tokio::test]
    async fn title_is_truncated_to_opening_words() {
        let title = KeywordAnnotator
            .suggest_title("I was walking through   an endless library at night")
            .await
            .unwrap();
        assert_eq!(title, "I was walking through an...");

        let short = KeywordAnnotator.suggest_title("Falling again").await.unwrap();
        assert_eq!(short, "Falling again");

        let empty = KeywordAnnotator.suggest_title("   ").await.unwrap();
        assert_eq!(empty, UNTITLED);
    }
}
