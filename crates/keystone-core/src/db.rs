use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection};

use crate::config::Config;

/// Idle timeout and lifetime for the single in-memory SQLite connection.
/// The pool's own defaults would recycle it and the database with it.
const MEMORY_DB_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Initialize the database connection from config.
///
/// In-memory SQLite databases live only as long as their connection, so they
/// get a single pooled connection that is never reaped.
pub async fn connect(config: &Config) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let db = SeaDatabase::connect(connect_options(config)).await?;
    tracing::info!(backend = ?db.get_database_backend(), "database connected");
    Ok(db)
}

fn connect_options(config: &Config) -> ConnectOptions {
    let mut opts = ConnectOptions::new(&config.database_url);
    opts.connect_timeout(config.db_connect_timeout)
        .acquire_timeout(config.db_connect_timeout)
        .sqlx_logging(config.is_local());

    if config.database_url.contains(":memory:") {
        opts.max_connections(1)
            .min_connections(1)
            .idle_timeout(MEMORY_DB_LIFETIME)
            .max_lifetime(MEMORY_DB_LIFETIME);
    } else {
        opts.max_connections(config.db_max_connections)
            .min_connections(config.db_min_connections);
    }
    opts
}
