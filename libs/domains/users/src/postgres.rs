use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{UserError, UserResult},
    models::{NewUser, Page, PageRequest, UpdateUser, User},
    repository::UserRepository,
};

/// PostgreSQL implementation of UserRepository (SeaORM)
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn internal(e: DbErr) -> UserError {
    UserError::Internal(format!("Database error: {}", e))
}

/// Map a unique-constraint violation on the email column to DuplicateEmail
fn map_insert_err(e: DbErr, email: &str) -> UserError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            UserError::DuplicateEmail(email.to_string())
        }
        _ => internal(e),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list(&self, page: PageRequest) -> UserResult<Page<User>> {
        let total = entity::Entity::find()
            .count(&self.db)
            .await
            .map_err(internal)?;

        let models = entity::Entity::find()
            .order_by_desc(entity::Column::CreatedAt)
            .order_by_desc(entity::Column::Id)
            .offset(page.offset())
            .limit(page.page_size)
            .all(&self.db)
            .await
            .map_err(internal)?;

        let data = models.into_iter().map(Into::into).collect();
        Ok(Page::new(data, page, total))
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let model = entity::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(internal)?;

        Ok(model.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        // Emails are stored lowercase, so comparing against the lowered
        // needle makes the lookup case-insensitive
        let model = entity::Entity::find()
            .filter(entity::Column::Email.eq(email.to_lowercase()))
            .one(&self.db)
            .await
            .map_err(internal)?;

        Ok(model.map(Into::into))
    }

    async fn create(&self, input: NewUser) -> UserResult<User> {
        let email = input.email.clone();
        let active_model: entity::ActiveModel = input.into();

        let model = entity::Entity::insert(active_model)
            .exec_with_returning(&self.db)
            .await
            .map_err(|e| map_insert_err(e, &email))?;

        tracing::info!(user_id = %model.id, "Created user");
        Ok(model.into())
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> UserResult<Option<User>> {
        let model = entity::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(internal)?;

        let Some(model) = model else {
            return Ok(None);
        };

        let new_email = changes.email.clone();

        let mut active = model.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        active.update(&self.db).await.map_err(|e| {
            match (&new_email, e.sql_err()) {
                (Some(email), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    UserError::DuplicateEmail(email.clone())
                }
                _ => internal(e),
            }
        })?;

        // Re-read so the returned record carries exactly what is stored
        let fresh = entity::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(internal)?;

        tracing::info!(user_id = %id, "Updated user");
        Ok(fresh.map(Into::into))
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let result = entity::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(internal)?;

        if result.rows_affected > 0 {
            tracing::info!(user_id = %id, "Deleted user");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
