use locale_fill::server::anthropic_factory;
use locale_fill::{AppConfig, AppState, CheckpointManager, LocaleFillServer};
use rmcp::{transport::stdio, ServiceExt};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_path = env::var("LOCALE_FILL_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = AppConfig::load_or_default(Some(&config_path));

    let directive = format!("locale_fill={}", config.logging.level);
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(directive.parse()?));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if config.logging.format == "json" {
        registry.with(fmt_layer.json()).init();
    } else {
        registry.with(fmt_layer).init();
    }

    tracing::info!(
        name = %config.server.name,
        version = %config.server.version,
        "Loaded configuration"
    );

    let checkpoints = match CheckpointManager::new(&config.checkpoint.db_path) {
        Ok(manager) => Some(manager),
        Err(e) => {
            tracing::warn!(error = %e, "Checkpoints disabled");
            None
        }
    };
    let app_state = AppState::new(config, checkpoints);

    if args.len() > 1 && args[1] == "--http" {
        let port = args
            .get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(9528);

        let bind_addr = args
            .get(3)
            .map(|s| s.as_str())
            .unwrap_or("127.0.0.1");

        run_http_server(app_state, bind_addr, port).await?;
    } else {
        tracing::info!("Starting MCP Server on stdio");
        let server = LocaleFillServer::new(app_state, anthropic_factory());
        let service = server.serve(stdio()).await?;
        service.waiting().await?;
    }

    tracing::info!("MCP Server shutting down");
    Ok(())
}

async fn run_http_server(app_state: AppState, bind_addr: &str, port: u16) -> anyhow::Result<()> {
    use axum::{
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use locale_fill::corpus::analyze_corpus;

    async fn health() -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "ok",
            "service": "locale-fill",
            "version": env!("CARGO_PKG_VERSION")
        }))
    }

    async fn info() -> impl IntoResponse {
        Json(serde_json::json!({
            "name": "locale-fill",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Fills in a new language for JSON locale files - HTTP Mode",
            "endpoints": {
                "GET /health": "Health check",
                "GET /info": "Server info",
                "POST /analyze": "Analyze locale files"
            }
        }))
    }

    async fn analyze_handler(
        State(state): State<AppState>,
        Json(payload): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        let files: Vec<String> = payload["files"]
            .as_array()
            .map(|files| {
                files
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        match analyze_corpus(&files, state.config.translation.batch_size).await {
            Ok(metadata) => match serde_json::to_value(metadata) {
                Ok(body) => (StatusCode::OK, Json(body)),
                Err(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": e.to_string()})),
                ),
            },
            Err(e) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            ),
        }
    }

    let app = Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/analyze", post(analyze_handler))
        .with_state(app_state);

    let addr = format!("{}:{}", bind_addr, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("HTTP Server listening on http://{}", addr);
    tracing::info!("  curl -X POST http://{}/analyze -H 'Content-Type: application/json' -d '{{\"files\": [\"/path/to/en.json\"]}}'", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
