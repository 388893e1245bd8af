use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::alarm::AlarmHandle;
use crate::cache::CacheService;
use crate::config::Config;
use crate::repositories::UserRepository;
use crate::services::UserService;
use crate::session::{SessionCookies, SessionStore};

pub mod auth;
pub mod users;

/// Shared application state available in all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
    pub cache: CacheService,
    pub sessions: SessionCookies,
    pub users: UserService,
    pub alarm: AlarmHandle,
}

impl AppState {
    /// Wire services over an open database and cache.
    pub fn new(config: Config, db: DatabaseConnection, cache: CacheService, alarm: AlarmHandle) -> Self {
        let cache = cache.with_op_timeout(config.cache_op_timeout);
        let sessions = SessionCookies::new(
            SessionStore::new(cache.clone(), config.session_ttl),
            config.is_production(),
        );
        let users = UserService::new(UserRepository::new(
            db.clone(),
            cache.clone(),
            config.user_cache_ttl,
        ));

        AppState {
            config: Arc::new(config),
            db,
            cache,
            sessions,
            users,
            alarm,
        }
    }
}
