use std::net::SocketAddr;

use axum::Router;
use http::{HeaderValue, Method, header};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use natours::{config::Config, routes::create_router, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("natours starting");

    let config = Config::load().map_err(|e| {
        tracing::error!(error = ?e, "failed to load config");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        app_env = %config.app_env,
        "config loaded"
    );

    // build everything that borrows config before it moves into AppState
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to parse listen address");
            anyhow::anyhow!("Failed to parse address: {}", e)
        })?;
    let cors = cors_layer(&config)?;

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to connect to database");
            anyhow::anyhow!("Failed to connect to database: {}", e)
        })?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to run migrations");
            anyhow::anyhow!("Failed to run migrations: {}", e)
        })?;

    tracing::info!("database ready");

    let state = AppState::new(db_pool, config).map_err(|e| {
        tracing::error!(error = ?e, "failed to build AppState");
        anyhow::anyhow!("Failed to create AppState: {}", e)
    })?;

    let app = with_http_layers(create_router(state), cors);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(error = ?e, addr = %addr, "failed to bind port");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    tracing::info!(addr = %addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "server error");
            anyhow::anyhow!("Server error: {}", e)
        })?;

    tracing::info!("server stopped");

    Ok(())
}

/// JSON logs, level from `RUST_LOG`
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,natours=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Credentialed CORS for the configured front-end origin, if any
fn cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    let Some(origin) = config.cors_allowed_origin.as_deref() else {
        return Ok(None);
    };

    let origin = HeaderValue::from_str(origin)
        .map_err(|e| anyhow::anyhow!("Invalid CORS_ALLOWED_ORIGIN {}: {}", origin, e))?;

    Ok(Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    ))
}

fn with_http_layers(router: Router, cors: Option<CorsLayer>) -> Router {
    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(
        TraceLayer::new_for_http().make_span_with(|req: &axum::extract::Request| {
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri(),
            )
        }),
    )
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}
