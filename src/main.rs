use academy_server::config::Settings;
use academy_server::store::PgStore;
use academy_server::{router, AppContext};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load()?;
    let store = PgStore::connect(&settings).await?;
    store.migrate().await?;
    log::info!("Database ready, migrations applied");

    let ctx = AppContext::new(store);
    let app = router(ctx.clone());

    let addr = settings.addr();
    let listener = TcpListener::bind(addr).await?;
    log::info!("Starting academy HTTP server on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await?;

    ctx.store.close().await;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for shutdown signal: {}", err);
    }
    log::info!("Shutting down");
}
