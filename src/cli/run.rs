use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;
use crate::core::db::{async_db, initialize_db};
use crate::pipeline;
use crate::store::KvStore;

pub async fn run(dry_run: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AppConfig::default();
    if dry_run {
        config.dry_run = true;
    }

    let db = async_db(&config.storage_path)
        .await
        .expect("Failed to connect to db");
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    let store = KvStore::new(db);

    println!(
        "Running notification pipeline{}",
        if config.dry_run { " (dry run)" } else { "" }
    );
    let report = pipeline::run(&config, &store).await?;
    for line in &report.lines {
        println!("{}", line);
    }
    println!("Run completed");

    Ok(())
}
