//! HTTP layer: page routes, static mounts and the JSON query API.

use anyhow::Context;
use axum::{Json, Router, extract::State, routing::post};
use quantra_core::{Assistant, ClearAck, Config, QueryRequest, QueryResponse};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

/// Page routes and the file each one serves, relative to the static root.
const PAGES: &[(&str, &str)] = &[
    ("/", "HOME/index.html"),
    ("/result", "RESULT/index2.html"),
    ("/weekly", "WEEKLY/weekly.html"),
    ("/today", "TODAY/today.html"),
    ("/maps", "MAP/maps.html"),
    ("/about", "ABOUT/about.html"),
    ("/credits", "CREADITS/creadit.html"),
    ("/ai-mode", "QUANTRA 0.5/ai_mode.html"),
];

/// Asset directories exposed under `/static`.
const STATIC_MOUNTS: &[(&str, &str)] = &[
    ("/static/home", "HOME"),
    ("/static/result", "RESULT"),
    ("/static/weekly", "WEEKLY"),
    ("/static/today", "TODAY"),
    ("/static/map", "MAP"),
    ("/static/about", "ABOUT"),
    ("/static/credits", "CREADITS"),
    ("/static/quantra", "QUANTRA 0.5"),
];

pub fn router(assistant: Arc<Assistant>, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/query", post(handle_query))
        .route("/clear-database", post(clear_database));

    for (route, file) in PAGES {
        router = router.route_service(route, ServeFile::new(static_dir.join(file)));
    }
    for (prefix, dir) in STATIC_MOUNTS {
        router = router.nest_service(prefix, ServeDir::new(static_dir.join(dir)));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(assistant)
}

/// Bind and serve until Ctrl-C / SIGTERM.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let assistant = Arc::new(Assistant::from_config(&config)?);
    if !assistant.ai_available() {
        warn!("Running without Gemini; chat and outfit replies use fixed text");
    }

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;

    let app = router(assistant, &config.server.static_dir);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, static_dir = %config.server.static_dir.display(), "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn handle_query(
    State(assistant): State<Arc<Assistant>>,
    Json(request): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let response = assistant.handle_query(request).await;
    debug!(turns = assistant.history().len(), "Conversation updated");
    Json(response)
}

async fn clear_database(State(assistant): State<Arc<Assistant>>) -> Json<ClearAck> {
    Json(assistant.clear_history())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
