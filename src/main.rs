use std::sync::Arc;

use blog_auth::app::build_router;
use blog_auth::auth::services::{AuthService, SessionPolicy};
use blog_auth::auth::session_token::SessionSigner;
use blog_auth::config::Config;
use blog_auth::db::connection::{ConnectivityCheck, PoolConnectivity, init_pool, run_migrations};
use chrono::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,blog_auth=debug,hyper_util=warn,tower_http=info")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

const PURGE_INTERVAL_SECS: u64 = 3600;

fn spawn_expiry_purge(auth_service: Arc<AuthService>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if let Err(e) = auth_service.purge_expired() {
                tracing::warn!(error = %e, "Expired record purge failed");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    setup_logging();
    tracing::info!("Starting blog-auth...");

    let config = Config::from_env()?;

    init_pool(&config.database_url)?;
    if config.run_migrations {
        let applied = run_migrations()?;
        tracing::info!(applied, "Migrations up to date");
    }

    let policy = SessionPolicy {
        expires_in: Duration::seconds(config.session_expires_in_secs),
        update_age: Duration::seconds(config.session_update_age_secs),
        secure_cookies: config.is_production(),
    };
    let auth_service = Arc::new(AuthService::new(
        SessionSigner::new(&config.auth_secret),
        policy,
    ));
    let connectivity: Arc<dyn ConnectivityCheck> = Arc::new(PoolConnectivity);
    let app = build_router(auth_service.clone(), connectivity, &config.frontend_url);

    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        tracing::info!("Running in Lambda mode");
        lambda_http::run(app).await
    } else {
        tracing::info!("Running in local HTTP server mode");
        spawn_expiry_purge(auth_service);
        let addr = config.server_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Server running at http://{}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}
