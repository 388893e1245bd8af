use anyhow::Context;
use keystone_core::migrations::{Migrator, MigratorTrait};
use keystone_core::{App, Config, db, logging};

/// Database-only operations selected on the command line.
enum DbCommand {
    Migrate,
    Rollback(u32),
}

fn db_command() -> Option<DbCommand> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--migrate") {
        return Some(DbCommand::Migrate);
    }

    let pos = args.iter().position(|arg| arg == "--rollback")?;
    let steps = args
        .get(pos + 1)
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(1);
    Some(DbCommand::Rollback(steps))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    logging::init_logging(&config);

    if let Some(command) = db_command() {
        let conn = db::connect(&config).await.context("database connection failed")?;
        match command {
            DbCommand::Migrate => {
                tracing::info!("Running pending database migrations...");
                Migrator::up(&conn, None).await?;
                tracing::info!("Migrations complete.");
            }
            DbCommand::Rollback(steps) => {
                tracing::info!("Rolling back {} migration(s)...", steps);
                Migrator::down(&conn, Some(steps)).await?;
                tracing::info!("Rollback complete.");
            }
        }
        return Ok(());
    }

    let app = App::with_config(config).await?;
    app.run().await?;
    Ok(())
}
