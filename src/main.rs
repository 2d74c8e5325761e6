use std::process::ExitCode;
use std::sync::Arc;

use dotenvy::dotenv;

use stockbin::{
    config::AppConfig,
    create_router,
    database::{create_database_pool, run_migrations},
    state::AppState,
    store::PgStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let db = create_database_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    log::info!("Database migrations applied");

    let addr = config.bind_addr();
    let state = AppState::new(Arc::new(PgStore::new(db)), config);
    state.barcodes.init().await?;

    let app = create_router(state);

    log::info!("stockbin server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
