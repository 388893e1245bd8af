//! Apply migrations and make sure an admin account exists.
//!
//! Reads `SEED_ADMIN_EMAIL`, `SEED_ADMIN_PASSWORD` and optionally
//! `SEED_ADMIN_NAME` (default `Admin`) on top of the usual configuration.

use anyhow::{Context, bail};
use keystone_core::auth::roles;
use keystone_core::services::Registration;
use keystone_core::{App, Config, logging};

fn required(key: &str) -> anyhow::Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("{key} must be set"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    logging::init_logging(&config);

    let email = required("SEED_ADMIN_EMAIL")?;
    let password = required("SEED_ADMIN_PASSWORD")?;
    let name = std::env::var("SEED_ADMIN_NAME")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "Admin".to_string());

    let app = App::with_config(config).await?;
    let users = &app.state().users;

    if let Some(existing) = users.repository().find_by_email(&email).await? {
        tracing::info!(user_id = existing.id, role = %existing.role, "admin account already exists");
        return Ok(());
    }

    let admin = users
        .create_with_role(
            Registration {
                name,
                email,
                password,
                phone: None,
            },
            roles::ADMIN,
        )
        .await?;
    tracing::info!(user_id = admin.id, "admin account created");
    Ok(())
}
