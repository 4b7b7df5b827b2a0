//! services/api/src/adapters/memory.rs
//!
//! A process-local implementation of the `DatabaseService` port. Selected when no
//! `DATABASE_URL` is configured, and used by the test suite. It enforces the same
//! constraints as the Postgres schema: unique usernames/emails, one relation of each
//! kind per dream, relations only for existing dreams, and cascading deletes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dream_journal_core::domain::{
    dedup_tags, Dream, DreamUpdate, DreamWithRelations, ImageGeneration, Insights, Interpretation,
    NewDream, NewUser, SortOrder, User, UserCredentials, VisualStyle,
};
use dream_journal_core::ports::{DatabaseService, PortError, PortResult};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    dreams: HashMap<Uuid, Dream>,
    // Keyed by dream id, which makes the one-per-dream constraint structural.
    interpretations: HashMap<Uuid, Interpretation>,
    image_generations: HashMap<Uuid, ImageGeneration>,
}

impl Tables {
    fn with_relations(&self, dream: &Dream) -> DreamWithRelations {
        DreamWithRelations {
            dream: dream.clone(),
            interpretation: self.interpretations.get(&dream.id).cloned(),
            image_generation: self.image_generations.get(&dream.id).cloned(),
        }
    }

    fn dream_mut(&mut self, dream_id: Uuid) -> PortResult<&mut Dream> {
        self.dreams
            .get_mut(&dream_id)
            .ok_or_else(|| PortError::NotFound(format!("Dream {} not found", dream_id)))
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|c| c.user.username == user.username) {
            return Err(PortError::Conflict(format!("Username {} already exists", user.username)));
        }
        if tables.users.values().any(|c| c.user.email == user.email) {
            return Err(PortError::Conflict(format!("Email {} already exists", user.email)));
        }

        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            name: user.name,
            avatar_url: user.avatar_url,
            created_at: Utc::now(),
        };
        tables.users.insert(
            created.id,
            UserCredentials {
                user: created.clone(),
                hashed_password: user.hashed_password,
            },
        );
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|c| c.user.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|c| c.user.email == email).cloned())
    }

    async fn create_dream(&self, dream: NewDream) -> PortResult<Dream> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&dream.user_id) {
            return Err(PortError::NotFound(format!("User {} not found", dream.user_id)));
        }

        let created = Dream {
            id: Uuid::new_v4(),
            user_id: dream.user_id,
            title: dream.title,
            content: dream.content,
            audio_url: dream.audio_url,
            audio_duration: dream.audio_duration,
            tags: dedup_tags(dream.tags),
            is_favorite: false,
            created_at: dream.created_at,
        };
        tables.dreams.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_dream(&self, dream_id: Uuid) -> PortResult<Dream> {
        let tables = self.tables.read().await;
        tables
            .dreams
            .get(&dream_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Dream {} not found", dream_id)))
    }

    async fn get_dream_with_relations(&self, dream_id: Uuid) -> PortResult<DreamWithRelations> {
        let tables = self.tables.read().await;
        tables
            .dreams
            .get(&dream_id)
            .map(|dream| tables.with_relations(dream))
            .ok_or_else(|| PortError::NotFound(format!("Dream {} not found", dream_id)))
    }

    async fn list_dreams_with_relations(
        &self,
        user_id: Uuid,
        order: SortOrder,
    ) -> PortResult<Vec<DreamWithRelations>> {
        let tables = self.tables.read().await;
        let mut dreams: Vec<&Dream> = tables.dreams.values().filter(|d| d.user_id == user_id).collect();
        dreams.sort_by_key(|d| d.created_at);
        if order == SortOrder::NewestFirst {
            dreams.reverse();
        }
        Ok(dreams.into_iter().map(|d| tables.with_relations(d)).collect())
    }

    async fn update_dream(&self, dream_id: Uuid, update: DreamUpdate) -> PortResult<Dream> {
        let mut tables = self.tables.write().await;
        let dream = tables.dream_mut(dream_id)?;
        update.apply_to(dream);
        Ok(dream.clone())
    }

    async fn toggle_favorite(&self, dream_id: Uuid) -> PortResult<Dream> {
        let mut tables = self.tables.write().await;
        let dream = tables.dream_mut(dream_id)?;
        dream.is_favorite = !dream.is_favorite;
        Ok(dream.clone())
    }

    async fn delete_dream(&self, dream_id: Uuid) -> PortResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.dreams.remove(&dream_id).is_some();
        tables.interpretations.remove(&dream_id);
        tables.image_generations.remove(&dream_id);
        Ok(removed)
    }

    async fn create_interpretation(
        &self,
        dream_id: Uuid,
        interpretation: &str,
        insights: &Insights,
    ) -> PortResult<Interpretation> {
        let mut tables = self.tables.write().await;
        if !tables.dreams.contains_key(&dream_id) {
            return Err(PortError::NotFound(format!("Dream {} not found", dream_id)));
        }
        if tables.interpretations.contains_key(&dream_id) {
            return Err(PortError::Conflict(format!(
                "Interpretation for dream {} already exists",
                dream_id
            )));
        }

        let created = Interpretation {
            id: Uuid::new_v4(),
            dream_id,
            interpretation: interpretation.to_string(),
            insights: insights.clone(),
            created_at: Utc::now(),
        };
        tables.interpretations.insert(dream_id, created.clone());
        Ok(created)
    }

    async fn get_interpretation_by_dream(&self, dream_id: Uuid) -> PortResult<Option<Interpretation>> {
        Ok(self.tables.read().await.interpretations.get(&dream_id).cloned())
    }

    async fn create_image_generation(
        &self,
        dream_id: Uuid,
        image_url: &str,
        style: VisualStyle,
        prompt: &str,
    ) -> PortResult<ImageGeneration> {
        let mut tables = self.tables.write().await;
        if !tables.dreams.contains_key(&dream_id) {
            return Err(PortError::NotFound(format!("Dream {} not found", dream_id)));
        }
        if tables.image_generations.contains_key(&dream_id) {
            return Err(PortError::Conflict(format!(
                "Image generation for dream {} already exists",
                dream_id
            )));
        }

        let created = ImageGeneration {
            id: Uuid::new_v4(),
            dream_id,
            image_url: image_url.to_string(),
            style,
            prompt: prompt.to_string(),
            created_at: Utc::now(),
        };
        tables.image_generations.insert(dream_id, created.clone());
        Ok(created)
    }

    async fn get_image_generation_by_dream(
        &self,
        dream_id: Uuid,
    ) -> PortResult<Option<ImageGeneration>> {
        Ok(self.tables.read().await.image_generations.get(&dream_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store_with_user() -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "luna".into(),
                email: "luna@example.com".into(),
                hashed_password: "hash".into(),
                name: None,
                avatar_url: None,
            })
            .await
            .unwrap();
        (store, user.id)
    }

    fn new_dream(user_id: Uuid, title: &str, age_days: i64) -> NewDream {
        NewDream {
            user_id,
            title: title.into(),
            content: "I was falling".into(),
            audio_url: None,
            audio_duration: None,
            tags: vec!["falling".into()],
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let (store, _) = store_with_user().await;
        let dup_name = store
            .create_user(NewUser {
                username: "luna".into(),
                email: "other@example.com".into(),
                hashed_password: "hash".into(),
                name: None,
                avatar_url: None,
            })
            .await;
        assert!(matches!(dup_name, Err(PortError::Conflict(_))));

        let dup_email = store
            .create_user(NewUser {
                username: "sol".into(),
                email: "luna@example.com".into(),
                hashed_password: "hash".into(),
                name: None,
                avatar_url: None,
            })
            .await;
        assert!(matches!(dup_email, Err(PortError::Conflict(_))));
    }

    #[tokio::test]
    async fn dreams_require_an_existing_user() {
        let store = InMemoryStore::new();
        let result = store.create_dream(new_dream(Uuid::new_v4(), "orphan", 0)).await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn relations_are_unique_per_dream_and_require_the_dream() {
        let (store, user_id) = store_with_user().await;
        let dream = store.create_dream(new_dream(user_id, "a", 0)).await.unwrap();

        store
            .create_interpretation(dream.id, "meaning", &Insights::default())
            .await
            .unwrap();
        let second = store
            .create_interpretation(dream.id, "again", &Insights::default())
            .await;
        assert!(matches!(second, Err(PortError::Conflict(_))));

        let missing = store
            .create_image_generation(Uuid::new_v4(), "http://img", VisualStyle::Sketch, "p")
            .await;
        assert!(matches!(missing, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_cascades_to_relations() {
        let (store, user_id) = store_with_user().await;
        let dream = store.create_dream(new_dream(user_id, "a", 0)).await.unwrap();
        store
            .create_interpretation(dream.id, "meaning", &Insights::default())
            .await
            .unwrap();
        store
            .create_image_generation(dream.id, "http://img", VisualStyle::Cosmic, "p")
            .await
            .unwrap();

        assert!(store.delete_dream(dream.id).await.unwrap());
        assert!(store.get_interpretation_by_dream(dream.id).await.unwrap().is_none());
        assert!(store.get_image_generation_by_dream(dream.id).await.unwrap().is_none());
        assert!(!store.delete_dream(dream.id).await.unwrap());
    }

    #[tokio::test]
    async fn listing_orders_by_dream_date() {
        let (store, user_id) = store_with_user().await;
        store.create_dream(new_dream(user_id, "old", 3)).await.unwrap();
        store.create_dream(new_dream(user_id, "new", 0)).await.unwrap();
        store.create_dream(new_dream(user_id, "mid", 1)).await.unwrap();

        let newest: Vec<String> = store
            .list_dreams_with_relations(user_id, SortOrder::NewestFirst)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.dream.title)
            .collect();
        assert_eq!(newest, vec!["new", "mid", "old"]);

        let oldest: Vec<String> = store
            .list_dreams_with_relations(user_id, SortOrder::OldestFirst)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.dream.title)
            .collect();
        assert_eq!(oldest, vec!["old", "mid", "new"]);
    }

    #[tokio::test]
    async fn toggle_twice_restores_the_flag() {
        let (store, user_id) = store_with_user().await;
        let dream = store.create_dream(new_dream(user_id, "a", 0)).await.unwrap();
        assert!(store.toggle_favorite(dream.id).await.unwrap().is_favorite);
        assert!(!store.toggle_favorite(dream.id).await.unwrap().is_favorite);
        assert!(matches!(
            store.toggle_favorite(Uuid::new_v4()).await,
            Err(PortError::NotFound(_))
        ));
    }
}
