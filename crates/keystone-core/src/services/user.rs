use crate::auth::{hash_password, roles, verify_dummy, verify_password};
use crate::error::{AppError, DomainError};
use crate::models::user::{self, UserResponse};
use crate::repositories::{NewUser, UserChanges, UserRepository};
use crate::session::SessionPrincipal;

/// A validated sign-up.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// User business rules on top of [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    pub fn new(repo: UserRepository) -> Self {
        UserService { repo }
    }

    pub fn repository(&self) -> &UserRepository {
        &self.repo
    }

    /// Register an account with the `user` role.
    pub async fn register(&self, registration: Registration) -> Result<user::Model, AppError> {
        self.create_with_role(registration, roles::USER).await
    }

    /// Create an account with an explicit role. Used by the seeder.
    pub async fn create_with_role(
        &self,
        registration: Registration,
        role: &str,
    ) -> Result<user::Model, AppError> {
        if self.repo.find_by_email(&registration.email).await?.is_some() {
            return Err(DomainError::USER_EMAIL_ALREADY_EXISTS.into());
        }

        let password_hash = hash_password(&registration.password)?;
        self.repo
            .create(NewUser {
                name: registration.name,
                email: registration.email,
                password_hash,
                phone: registration.phone,
                role: role.to_string(),
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<UserResponse, AppError> {
        self.repo.find_by_id(id).await
    }

    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<user::Model, AppError> {
        self.repo.update(id, changes).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.repo.delete(id).await
    }

    /// Check credentials and build the session principal.
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller: both are `ERR:SESSION_UNAUTHORIZED`, and both pay for one
    /// argon2 verification.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionPrincipal, AppError> {
        let Some(user) = self.repo.find_by_email(email).await? else {
            tracing::debug!("login for unknown email");
            verify_dummy(password);
            return Err(DomainError::SESSION_UNAUTHORIZED.into());
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = user.id, "login with wrong password");
            return Err(DomainError::SESSION_UNAUTHORIZED.into());
        }

        Ok(SessionPrincipal::from(user))
    }
}
