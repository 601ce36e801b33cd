use anyhow::Context;
use clap::Parser;
use tracing::info;

use procurement_api as api;

/// Create the first administrator account.
#[derive(Parser)]
#[command(name = "seed-admin", version)]
struct Cli {
    #[arg(long, default_value = "admin")]
    username: String,

    #[arg(long)]
    email: String,

    /// Falls back to the SEED_ADMIN_PASSWORD environment variable.
    #[arg(long, env = "SEED_ADMIN_PASSWORD")]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let db = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db).await?;
    }

    let account =
        api::services::accounts::create_superuser(&db, &cli.username, &cli.email, &cli.password)
            .await?;
    info!(user_id = %account.id, "administrator ready");
    println!("Created administrator '{}'", account.username);
    Ok(())
}
