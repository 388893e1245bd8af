use std::time::Duration;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set, SqlErr,
};

use crate::cache::CacheService;
use crate::error::{AppError, DomainError};
use crate::models::user::{self, Entity as User, UserResponse};
use crate::session::Cleanup;

pub const USER_CACHE_PREFIX: &str = "CACHE:USER:";

/// Columns for a new row; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: String,
}

/// Full replacement of the editable profile columns.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Database access for `users`, with a read-through cache in front of
/// lookups by id. Only the public projection is cached; password hashes
/// stay in the database.
///
/// The cache never fails a request: read and write errors are logged and
/// the database result is used.
#[derive(Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
    cache: CacheService,
    cache_ttl: Duration,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection, cache: CacheService, cache_ttl: Duration) -> Self {
        UserRepository {
            db,
            cache,
            cache_ttl,
        }
    }

    pub fn cache_key(id: i64) -> String {
        format!("{USER_CACHE_PREFIX}{id}")
    }

    pub async fn find_by_id(&self, id: i64) -> Result<UserResponse, AppError> {
        let key = Self::cache_key(id);

        match self.cache.get_json::<UserResponse>(&key).await {
            Ok(Some(user)) => return Ok(user),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, user_id = id, "failed to get user from cache");
            }
        }

        let user = User::find_by_id(id)
            .one(&self.db)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| DomainError::USER_NOT_FOUND.with_args([id]))?;

        if let Err(err) = self.cache.set_json(&key, &user, Some(self.cache_ttl)).await {
            tracing::warn!(error = %err, user_id = id, "failed to set user in cache");
        }

        Ok(user)
    }

    /// Uncached; used by login, which must see the current password hash.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, AppError> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    pub async fn create(&self, new: NewUser) -> Result<user::Model, AppError> {
        let now = Utc::now();
        let row = user::ActiveModel {
            name: Set(new.name),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            phone: Set(new.phone),
            role: Set(new.role),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let user = row.insert(&self.db).await.map_err(unique_email)?;
        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<user::Model, AppError> {
        let existing = User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::USER_NOT_FOUND.with_args([id]))?;

        let mut row = existing.into_active_model();
        row.name = Set(changes.name);
        row.email = Set(changes.email);
        row.phone = Set(changes.phone);
        row.updated_at = Set(Utc::now());

        let user = row.update(&self.db).await.map_err(unique_email)?;
        self.invalidate(id).await;
        Ok(user)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = User::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DomainError::USER_NOT_FOUND.with_args([id]).into());
        }

        self.invalidate(id).await;
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }

    /// Drop the cached row for `id`. Best-effort.
    pub async fn invalidate(&self, id: i64) -> Cleanup {
        match self.cache.del(&Self::cache_key(id)).await {
            Ok(true) => Cleanup::Done,
            Ok(false) => Cleanup::Skipped,
            Err(err) => {
                tracing::warn!(error = %err, user_id = id, "failed to delete user from cache");
                Cleanup::Failed(err.to_string())
            }
        }
    }
}

fn unique_email(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => DomainError::USER_EMAIL_ALREADY_EXISTS.into(),
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::cache::{CacheBackend, InMemoryCache};
    use crate::config::Config;
    use crate::migrations::Migrator;

    async fn repository() -> (InMemoryCache, UserRepository) {
        let db = crate::db::connect(&Config::for_tests()).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let backend = InMemoryCache::new();
        let repo = UserRepository::new(
            db,
            CacheService::new(backend.clone()),
            Duration::from_secs(86_400),
        );
        (backend, repo)
    }

    fn jane() -> NewUser {
        NewUser {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: "hash".to_string(),
            phone: None,
            role: "user".to_string(),
        }
    }

    fn domain_code(err: AppError) -> &'static str {
        match err {
            AppError::Domain(domain) => domain.code(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_populates_cache() {
        let (backend, repo) = repository().await;
        let created = repo.create(jane()).await.unwrap();
        let key = UserRepository::cache_key(created.id);
        assert!(backend.get(&key).await.unwrap().is_none());

        let found = repo.find_by_id(created.id).await.unwrap();
        assert_eq!(found, UserResponse::from(created));
        assert!(backend.ttl(&key).await.unwrap() > Duration::from_secs(86_000));
    }

    #[tokio::test]
    async fn test_cached_entry_has_no_password_hash() {
        let (backend, repo) = repository().await;
        let created = repo.create(jane()).await.unwrap();
        repo.find_by_id(created.id).await.unwrap();

        let raw = backend
            .get(&UserRepository::cache_key(created.id))
            .await
            .unwrap()
            .unwrap();
        let cached: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(cached["email"], "jane@example.com");
        assert!(cached.get("passwordHash").is_none());
        assert!(cached.get("password_hash").is_none());
        assert!(!raw.contains("hash"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_database() {
        let (backend, repo) = repository().await;
        let created = repo.create(jane()).await.unwrap();
        let mut cached = UserResponse::from(created.clone());
        cached.name = "Cached".to_string();
        backend
            .set(
                &UserRepository::cache_key(created.id),
                &serde_json::to_string(&cached).unwrap(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(repo.find_by_id(created.id).await.unwrap().name, "Cached");
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_falls_through() {
        let (backend, repo) = repository().await;
        let created = repo.create(jane()).await.unwrap();
        backend
            .set(&UserRepository::cache_key(created.id), "{nope", None)
            .await
            .unwrap();

        assert_eq!(
            repo.find_by_id(created.id).await.unwrap(),
            UserResponse::from(created)
        );
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found_with_id() {
        let (_, repo) = repository().await;
        let err = repo.find_by_id(99).await.unwrap_err();
        let (status, body) = err.render(crate::i18n::Locale::EnUs);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "User with ID 99 not found");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let (_, repo) = repository().await;
        repo.create(jane()).await.unwrap();
        let err = repo.create(jane()).await.unwrap_err();
        assert_eq!(domain_code(err), "ERR:USER_EMAIL_ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let (backend, repo) = repository().await;
        let created = repo.create(jane()).await.unwrap();
        repo.find_by_id(created.id).await.unwrap();

        let updated = repo
            .update(
                created.id,
                UserChanges {
                    name: "Janet".to_string(),
                    email: "janet@example.com".to_string(),
                    phone: Some("+905551234567".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Janet");
        assert!(
            backend
                .get(&UserRepository::cache_key(created.id))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(repo.find_by_id(created.id).await.unwrap().name, "Janet");
    }

    #[tokio::test]
    async fn test_delete_then_find_is_not_found() {
        let (_, repo) = repository().await;
        let created = repo.create(jane()).await.unwrap();
        repo.find_by_id(created.id).await.unwrap();

        repo.delete(created.id).await.unwrap();
        let err = repo.find_by_id(created.id).await.unwrap_err();
        assert_eq!(domain_code(err), "ERR:USER_NOT_FOUND");

        let err = repo.delete(created.id).await.unwrap_err();
        assert_eq!(domain_code(err), "ERR:USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let (_, repo) = repository().await;
        repo.create(jane()).await.unwrap();
        assert!(repo.find_by_email("jane@example.com").await.unwrap().is_some());
        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    }
}
