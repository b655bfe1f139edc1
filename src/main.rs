use catalog_api::{bootstrap_admin, build_cache, config::Config, rest, store, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "catalog_api=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = store::connect(&config.database_url).await?;
    tracing::info!(url = %config.database_url, "database ready");

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        bootstrap_admin(&pool, username, password).await?;
    }

    let cache = build_cache(&config).await;
    let bind_addr = config.bind_addr.clone();
    let production = config.production;
    let app = rest::router(AppState::new(pool, cache, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%production, "REST API listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
