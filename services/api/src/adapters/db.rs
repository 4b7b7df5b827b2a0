//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dream_journal_core::domain::{
    dedup_tags, Dream, DreamUpdate, DreamWithRelations, ImageGeneration, Insights, Interpretation,
    NewDream, NewUser, SortOrder, User, UserCredentials, VisualStyle,
};
use dream_journal_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

const DREAM_COLUMNS: &str =
    "id, user_id, title, content, audio_url, audio_duration, tags, is_favorite, created_at";
const INTERPRETATION_COLUMNS: &str = "id, dream_id, interpretation, insights, created_at";
const IMAGE_COLUMNS: &str = "id, dream_id, image_url, style, prompt, created_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, name, avatar_url, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Translates driver errors into port errors, recognizing Postgres constraint violations.
fn map_db_error(e: sqlx::Error, what: &str) -> PortError {
    match &e {
        sqlx::Error::RowNotFound => PortError::NotFound(what.to_string()),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => PortError::Conflict(format!("{} already exists", what)),
            // foreign_key_violation
            Some("23503") => PortError::NotFound(format!("{}: referenced row is missing", what)),
            _ => PortError::Unexpected(e.to_string()),
        },
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    name: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                username: self.username,
                email: self.email,
                name: self.name,
                avatar_url: self.avatar_url,
                created_at: self.created_at,
            },
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct DreamRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    audio_url: Option<String>,
    audio_duration: Option<i32>,
    tags: Vec<String>,
    is_favorite: bool,
    created_at: DateTime<Utc>,
}
impl DreamRecord {
    fn to_domain(self) -> Dream {
        Dream {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            audio_url: self.audio_url,
            audio_duration: self.audio_duration,
            tags: self.tags,
            is_favorite: self.is_favorite,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct InterpretationRecord {
    id: Uuid,
    dream_id: Uuid,
    interpretation: String,
    insights: Json<Insights>,
    created_at: DateTime<Utc>,
}
impl InterpretationRecord {
    fn to_domain(self) -> Interpretation {
        Interpretation {
            id: self.id,
            dream_id: self.dream_id,
            interpretation: self.interpretation,
            insights: self.insights.0,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ImageGenerationRecord {
    id: Uuid,
    dream_id: Uuid,
    image_url: String,
    style: String,
    prompt: String,
    created_at: DateTime<Utc>,
}
impl ImageGenerationRecord {
    fn to_domain(self) -> ImageGeneration {
        ImageGeneration {
            id: self.id,
            dream_id: self.dream_id,
            image_url: self.image_url,
            style: VisualStyle::from_name(&self.style),
            prompt: self.prompt,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, username, email, password_hash, name, avatar_url) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.name)
        .bind(&user.avatar_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "User"))?;
        Ok(record.to_domain().user)
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "User"))?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "User"))?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn create_dream(&self, dream: NewDream) -> PortResult<Dream> {
        let record = sqlx::query_as::<_, DreamRecord>(&format!(
            "INSERT INTO dreams (id, user_id, title, content, audio_url, audio_duration, tags, is_favorite, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8) RETURNING {}",
            DREAM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dream.user_id)
        .bind(&dream.title)
        .bind(&dream.content)
        .bind(&dream.audio_url)
        .bind(dream.audio_duration)
        .bind(dedup_tags(dream.tags))
        .bind(dream.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("User {}", dream.user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_dream(&self, dream_id: Uuid) -> PortResult<Dream> {
        let record = sqlx::query_as::<_, DreamRecord>(&format!(
            "SELECT {} FROM dreams WHERE id = $1",
            DREAM_COLUMNS
        ))
        .bind(dream_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("Dream {} not found", dream_id)))?;
        Ok(record.to_domain())
    }

    async fn get_dream_with_relations(&self, dream_id: Uuid) -> PortResult<DreamWithRelations> {
        let dream = self.get_dream(dream_id).await?;
        let interpretation = self.get_interpretation_by_dream(dream_id).await?;
        let image_generation = self.get_image_generation_by_dream(dream_id).await?;
        Ok(DreamWithRelations {
            dream,
            interpretation,
            image_generation,
        })
    }

    async fn list_dreams_with_relations(
        &self,
        user_id: Uuid,
        order: SortOrder,
    ) -> PortResult<Vec<DreamWithRelations>> {
        let direction = match order {
            SortOrder::NewestFirst => "DESC",
            SortOrder::OldestFirst => "ASC",
        };
        let dreams = sqlx::query_as::<_, DreamRecord>(&format!(
            "SELECT {} FROM dreams WHERE user_id = $1 ORDER BY created_at {}",
            DREAM_COLUMNS, direction
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Dreams"))?;

        let ids: Vec<Uuid> = dreams.iter().map(|d| d.id).collect();

        let mut interpretations: HashMap<Uuid, Interpretation> =
            sqlx::query_as::<_, InterpretationRecord>(&format!(
                "SELECT {} FROM interpretations WHERE dream_id = ANY($1)",
                INTERPRETATION_COLUMNS
            ))
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Interpretations"))?
            .into_iter()
            .map(|r| (r.dream_id, r.to_domain()))
            .collect();

        let mut images: HashMap<Uuid, ImageGeneration> =
            sqlx::query_as::<_, ImageGenerationRecord>(&format!(
                "SELECT {} FROM image_generations WHERE dream_id = ANY($1)",
                IMAGE_COLUMNS
            ))
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Image generations"))?
            .into_iter()
            .map(|r| (r.dream_id, r.to_domain()))
            .collect();

        Ok(dreams
            .into_iter()
            .map(|record| {
                let dream = record.to_domain();
                DreamWithRelations {
                    interpretation: interpretations.remove(&dream.id),
                    image_generation: images.remove(&dream.id),
                    dream,
                }
            })
            .collect())
    }

    async fn update_dream(&self, dream_id: Uuid, update: DreamUpdate) -> PortResult<Dream> {
        let record = sqlx::query_as::<_, DreamRecord>(&format!(
            "UPDATE dreams SET \
                title = COALESCE($2, title), \
                content = COALESCE($3, content), \
                tags = COALESCE($4, tags), \
                is_favorite = COALESCE($5, is_favorite), \
                created_at = COALESCE($6, created_at) \
             WHERE id = $1 RETURNING {}",
            DREAM_COLUMNS
        ))
        .bind(dream_id)
        .bind(update.title)
        .bind(update.content)
        .bind(update.tags.map(dedup_tags))
        .bind(update.is_favorite)
        .bind(update.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("Dream {} not found", dream_id)))?;
        Ok(record.to_domain())
    }

    async fn toggle_favorite(&self, dream_id: Uuid) -> PortResult<Dream> {
        let record = sqlx::query_as::<_, DreamRecord>(&format!(
            "UPDATE dreams SET is_favorite = NOT is_favorite WHERE id = $1 RETURNING {}",
            DREAM_COLUMNS
        ))
        .bind(dream_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("Dream {} not found", dream_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_dream(&self, dream_id: Uuid) -> PortResult<bool> {
        // Relations go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM dreams WHERE id = $1")
            .bind(dream_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Dream"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_interpretation(
        &self,
        dream_id: Uuid,
        interpretation: &str,
        insights: &Insights,
    ) -> PortResult<Interpretation> {
        let record = sqlx::query_as::<_, InterpretationRecord>(&format!(
            "INSERT INTO interpretations (id, dream_id, interpretation, insights) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            INTERPRETATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dream_id)
        .bind(interpretation)
        .bind(Json(insights))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("Interpretation for dream {}", dream_id)))?;
        Ok(record.to_domain())
    }

    async fn get_interpretation_by_dream(&self, dream_id: Uuid) -> PortResult<Option<Interpretation>> {
        let record = sqlx::query_as::<_, InterpretationRecord>(&format!(
            "SELECT {} FROM interpretations WHERE dream_id = $1",
            INTERPRETATION_COLUMNS
        ))
        .bind(dream_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Interpretation"))?;
        Ok(record.map(InterpretationRecord::to_domain))
    }

    async fn create_image_generation(
        &self,
        dream_id: Uuid,
        image_url: &str,
        style: VisualStyle,
        prompt: &str,
    ) -> PortResult<ImageGeneration> {
        let record = sqlx::query_as::<_, ImageGenerationRecord>(&format!(
            "INSERT INTO image_generations (id, dream_id, image_url, style, prompt) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            IMAGE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dream_id)
        .bind(image_url)
        .bind(style.as_str())
        .bind(prompt)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("Image generation for dream {}", dream_id)))?;
        Ok(record.to_domain())
    }

    async fn get_image_generation_by_dream(
        &self,
        dream_id: Uuid,
    ) -> PortResult<Option<ImageGeneration>> {
        let record = sqlx::query_as::<_, ImageGenerationRecord>(&format!(
            "SELECT {} FROM image_generations WHERE dream_id = $1",
            IMAGE_COLUMNS
        ))
        .bind(dream_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Image generation"))?;
        Ok(record.map(ImageGenerationRecord::to_domain))
    }
}
