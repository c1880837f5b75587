use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, MAX_PAGE_SIZE, NewUser, Page, PageRequest, UpdateUser, User};
use crate::repository::UserRepository;

/// Service layer for User business logic.
///
/// All validation happens here, before any repository call; rule
/// violations never reach the store.
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// List users, newest first
    pub async fn list_users(&self, page: PageRequest) -> UserResult<Page<User>> {
        if page.page < 1 {
            return Err(UserError::Validation("page must be at least 1".to_string()));
        }
        if page.page_size < 1 || page.page_size > MAX_PAGE_SIZE {
            return Err(UserError::Validation(format!(
                "pageSize must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        self.repository.list(page).await
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: Uuid) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Create a new user
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(UserError::Validation("name must not be blank".to_string()));
        }

        let email = normalize_email(&input.email)?;

        if self.repository.get_by_email(&email).await?.is_some() {
            return Err(UserError::DuplicateEmail(email));
        }

        self.repository
            .create(NewUser {
                name: name.to_string(),
                email,
            })
            .await
    }

    /// Update an existing user
    pub async fn update_user(&self, id: Uuid, input: UpdateUser) -> UserResult<User> {
        if input.is_empty() {
            return Err(UserError::Validation(
                "at least one of name or email must be provided".to_string(),
            ));
        }

        let name = match input.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(UserError::Validation("name must not be blank".to_string()));
                }
                Some(name)
            }
            None => None,
        };

        let email = match input.email {
            Some(email) => {
                let email = normalize_email(&email)?;

                // The email must not belong to a different user
                if let Some(existing) = self.repository.get_by_email(&email).await?
                    && existing.id != id
                {
                    return Err(UserError::DuplicateEmail(email));
                }
                Some(email)
            }
            None => None,
        };

        self.repository
            .update(id, UpdateUser { name, email })
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Delete a user
    pub async fn delete_user(&self, id: Uuid) -> UserResult<()> {
        let deleted = self.repository.delete(id).await?;

        if !deleted {
            return Err(UserError::NotFound(id));
        }

        Ok(())
    }
}

/// Trim, syntax-check, and lowercase an email address
fn normalize_email(email: &str) -> UserResult<String> {
    let email = email.trim();
    if !email.validate_email() {
        return Err(UserError::Validation(
            "email must be a valid email address".to_string(),
        ));
    }
    Ok(email.to_lowercase())
}
