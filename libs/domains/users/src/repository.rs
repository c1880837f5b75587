use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, Page, PageRequest, UpdateUser, User};

/// Repository port for User persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// List users ordered by creation time, newest first
    async fn list(&self, page: PageRequest) -> UserResult<Page<User>>;

    /// Get a user by ID
    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Get a user by email, case-insensitively
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Create a new user; the adapter assigns the id and timestamps
    async fn create(&self, input: NewUser) -> UserResult<User>;

    /// Apply the present fields and refresh `updated_at`.
    ///
    /// Returns `None` when the id does not resolve.
    async fn update(&self, id: Uuid, changes: UpdateUser) -> UserResult<Option<User>>;

    /// Delete a user by ID; true iff a row was removed
    async fn delete(&self, id: Uuid) -> UserResult<bool>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self, page: PageRequest) -> UserResult<Page<User>> {
        let users = self.users.read().await;

        let mut all: Vec<User> = users.values().cloned().collect();
        // Newest first; ids are time-ordered (UUIDv7) so they break ties
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = all.len() as u64;
        let data: Vec<User> = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();

        Ok(Page::new(data, page, total))
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        let needle = email.to_lowercase();
        Ok(users.values().find(|u| u.email == needle).cloned())
    }

    async fn create(&self, input: NewUser) -> UserResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == input.email) {
            return Err(UserError::DuplicateEmail(input.email));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            name: input.name,
            email: input.email,
            created_at: Some(now),
            updated_at: Some(now),
        };
        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> UserResult<Option<User>> {
        let mut users = self.users.write().await;

        if !users.contains_key(&id) {
            return Ok(None);
        }

        if let Some(ref new_email) = changes.email {
            let taken = users.values().any(|u| u.id != id && u.email == *new_email);
            if taken {
                return Err(UserError::DuplicateEmail(new_email.clone()));
            }
        }

        let user = match users.get_mut(&id) {
            Some(user) => user,
            None => return Ok(None),
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        user.updated_at = Some(Utc::now());
        let updated = user.clone();

        tracing::info!(user_id = %id, "Updated user");
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let mut users = self.users.write().await;

        if users.remove(&id).is_some() {
            tracing::info!(user_id = %id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = InMemoryUserRepository::new();

        let user = repo
            .create(new_user("Ada Lovelace", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(user.name, "Ada Lovelace");
        assert!(user.created_at.is_some());
        assert!(user.updated_at.is_some());

        let fetched = repo.get_by_id(user.id).await.unwrap();
        assert_eq!(fetched, Some(user));
    }

    #[tokio::test]
    async fn test_duplicate_email_error() {
        let repo = InMemoryUserRepository::new();

        repo.create(new_user("Ada", "ada@example.com"))
            .await
            .unwrap();

        let result = repo.create(new_user("Other Ada", "ada@example.com")).await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_get_by_email_is_case_insensitive() {
        let repo = InMemoryUserRepository::new();

        repo.create(new_user("Ada", "ada@example.com"))
            .await
            .unwrap();

        let found = repo.get_by_email("Ada@Example.COM").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let repo = InMemoryUserRepository::new();

        for i in 0..3 {
            repo.create(new_user(&format!("User {}", i), &format!("u{}@example.com", i)))
                .await
                .unwrap();
        }

        let page = repo.list(PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.data[0].name, "User 2");
        assert_eq!(page.data[2].name, "User 0");
    }

    #[tokio::test]
    async fn test_list_pagination_past_the_end() {
        let repo = InMemoryUserRepository::new();

        for i in 0..5 {
            repo.create(new_user(&format!("User {}", i), &format!("u{}@example.com", i)))
                .await
                .unwrap();
        }

        let page = repo.list(PageRequest::new(3, 20)).await.unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp() {
        let repo = InMemoryUserRepository::new();

        let user = repo
            .create(new_user("Ada", "ada@example.com"))
            .await
            .unwrap();

        let updated = repo
            .update(
                user.id,
                UpdateUser {
                    name: Some("Ada King".to_string()),
                    email: None,
                },
            )
            .await
            .unwrap()
            .expect("user should exist");

        assert_eq!(updated.name, "Ada King");
        assert_eq!(updated.email, "ada@example.com");
        assert!(updated.updated_at >= user.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let repo = InMemoryUserRepository::new();

        let result = repo
            .update(
                Uuid::now_v7(),
                UpdateUser {
                    name: Some("Nobody".to_string()),
                    email: None,
                },
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_email_taken_by_other() {
        let repo = InMemoryUserRepository::new();

        repo.create(new_user("Ada", "ada@example.com"))
            .await
            .unwrap();
        let grace = repo
            .create(new_user("Grace", "grace@example.com"))
            .await
            .unwrap();

        let result = repo
            .update(
                grace.id,
                UpdateUser {
                    name: None,
                    email: Some("ada@example.com".to_string()),
                },
            )
            .await;
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryUserRepository::new();

        let user = repo
            .create(new_user("Ada", "ada@example.com"))
            .await
            .unwrap();

        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    }
}
