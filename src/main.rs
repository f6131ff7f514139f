use mimalloc::MiMalloc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let loglevel = newsdb::config::loglevel();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let cfg = newsdb::DatabaseConfig::from_env()?;
    info!(
        database_url = %cfg.redacted_url(),
        max_attempts = cfg.max_attempts,
        wait_increment = cfg.wait_increment,
        loglevel = %loglevel
    );

    let schema = newsdb::Schema::news();
    let db = newsdb::init(&cfg, &schema).await?;
    info!(database = %db.name(), "tables created");
    Ok(())
}
