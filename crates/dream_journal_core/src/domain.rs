//! crates/dream_journal_core/src/domain.rs
//!
//! Defines the core data structures of the dream journal.
//! Serialized field names are camelCase, which is what the browser client reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

/// A registered user, without credentials. This is what the API hands out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/registration - contains the password hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// The fields needed to create a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

//=========================================================================================
// Dreams
//=========================================================================================

/// A journal entry. `created_at` doubles as the date the dream happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dream {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub audio_url: Option<String>,
    pub audio_duration: Option<i32>,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

/// A fully normalized dream, ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewDream {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub audio_url: Option<String>,
    pub audio_duration: Option<i32>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DreamUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl DreamUpdate {
    /// Applies the present fields onto `dream`.
    pub fn apply_to(&self, dream: &mut Dream) {
        if let Some(title) = &self.title {
            dream.title = title.clone();
        }
        if let Some(content) = &self.content {
            dream.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            dream.tags = dedup_tags(tags.clone());
        }
        if let Some(is_favorite) = self.is_favorite {
            dream.is_favorite = is_favorite;
        }
        if let Some(created_at) = self.created_at {
            dream.created_at = created_at;
        }
    }
}

/// Tags behave as a set; keeps the first occurrence of each.
pub fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

/// Store-level ordering of a user's dreams, by dream date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

//=========================================================================================
// Interpretations
//=========================================================================================

/// Structured insight extracted alongside the narrative interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Insights {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

/// What the interpretation provider returns for a dream text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamAnalysis {
    pub interpretation: String,
    pub insights: Insights,
}

/// An AI interpretation. At most one exists per dream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub id: Uuid,
    pub dream_id: Uuid,
    pub interpretation: String,
    pub insights: Insights,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Image generations
//=========================================================================================

/// The fixed set of illustration styles. Unknown names resolve to `Realistic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VisualStyle {
    #[default]
    Realistic,
    Sketch,
    Watercolor,
    Surreal,
    Psychedelic,
    Cosmic,
}

impl VisualStyle {
    pub const ALL: [VisualStyle; 6] = [
        VisualStyle::Realistic,
        VisualStyle::Sketch,
        VisualStyle::Watercolor,
        VisualStyle::Surreal,
        VisualStyle::Psychedelic,
        VisualStyle::Cosmic,
    ];

    /// Resolves a style name, falling back to `Realistic` for anything unrecognized.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(name.trim()))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualStyle::Realistic => "realistic",
            VisualStyle::Sketch => "sketch",
            VisualStyle::Watercolor => "watercolor",
            VisualStyle::Surreal => "surreal",
            VisualStyle::Psychedelic => "psychedelic",
            VisualStyle::Cosmic => "cosmic",
        }
    }

    /// The instruction that opens every image prompt in this style.
    pub fn prompt_prefix(&self) -> &'static str {
        match self {
            VisualStyle::Realistic => "Create a detailed, realistic visualization of this dream scene with natural lighting, accurate proportions, and photorealistic details:",
            VisualStyle::Sketch => "Create a detailed pencil sketch drawing depicting this dream scene. Use clean lines, subtle shading, and a hand-drawn quality with clear focus on the main elements:",
            VisualStyle::Watercolor => "Create a soft, ethereal watercolor painting depicting this dream scene with gentle color blending, flowing transitions, and slightly blurred edges:",
            VisualStyle::Surreal => "Create a surrealist, Dali-inspired dreamscape depicting this scene with impossible physics, distorted perspectives, and symbolic juxtapositions:",
            VisualStyle::Psychedelic => "Create a vibrant, psychedelic visualization of this dream with fractals, intense saturated colors, swirling patterns, and visual distortions reminiscent of altered states of consciousness:",
            VisualStyle::Cosmic => "Create a cosmic, space-inspired visualization of this dream with celestial elements, stars, nebulae, and cosmic energy fields, creating a sense of infinite possibility and transcendence:",
        }
    }

    /// Builds the complete prompt sent to the image provider.
    pub fn build_prompt(&self, dream_text: &str) -> String {
        format!(
            "{} {}\n\nEnsure the image captures the emotional essence and symbolism of the dream. \
             Focus on creating a compelling visual narrative that evokes the mood described. \
             Do not include any text in the image.",
            self.prompt_prefix(),
            dream_text.trim()
        )
    }
}

impl std::fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An AI illustration. At most one exists per dream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageGeneration {
    pub id: Uuid,
    pub dream_id: Uuid,
    pub image_url: String,
    pub style: VisualStyle,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Read-time composite
//=========================================================================================

/// A dream with whichever relations exist so far. `None` means "not yet processed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DreamWithRelations {
    pub dream: Dream,
    pub interpretation: Option<Interpretation>,
    pub image_generation: Option<ImageGeneration>,
}
