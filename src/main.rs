mod client;
mod clients;
mod config;
mod docs;
mod handlers;
mod models;
mod permissions;
mod routes;
mod services;
mod store;
mod sync;
mod utils;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use std::panic;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use clients::{NullUserDirectory, UserDirectory, UserServiceClient};
use config::Config;
use docs::ApiDoc;
use routes::create_api_routes;
use store::memory::MemoryNoteStore;
use store::postgres::PgNoteStore;
use store::NoteStore;
use sync::broadcaster::RoomBroadcaster;
use sync::connection::websocket_handler;
use sync::coordinator::EditCoordinator;
use sync::registry::SessionRegistry;

/// Shared state handed to every HTTP handler and WebSocket connection.
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub coordinator: Arc<EditCoordinator>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "easynotes_sync=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    let config = config::init_config(config);

    if config.auth_jwt_secret.is_none() {
        warn!("No auth JWT secret configured - all authenticated requests will be rejected");
    }
    info!(
        "Advertised autosave debounce: {} ms",
        config.autosave_delay_ms
    );

    // Pick the note store
    let store: Arc<dyn NoteStore> = match &config.db_url {
        Some(db_url) => match PgNoteStore::connect(db_url).await {
            Ok(store) => {
                info!("Database initialized successfully");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to in-memory note store - notes will not survive restarts");
                Arc::new(MemoryNoteStore::new())
            }
        },
        None => {
            warn!("No database URL configured - using in-memory note store");
            Arc::new(MemoryNoteStore::new())
        }
    };

    // User directory for share-by-email lookups
    let users: Arc<dyn UserDirectory> = match (&config.user_service_url, &config.auth_jwt_secret) {
        (Some(url), Some(secret)) => Arc::new(UserServiceClient::new(
            url.clone(),
            secret.clone(),
            config.service_name.clone(),
        )),
        _ => {
            warn!("No user service configured - sharing by email will not resolve users");
            Arc::new(NullUserDirectory)
        }
    };

    // Wire the synchronization engine
    let registry = Arc::new(SessionRegistry::new());
    let broadcaster = RoomBroadcaster::new(registry.clone());
    let coordinator = Arc::new(EditCoordinator::new(store, broadcaster, users));
    let state = Arc::new(AppState {
        registry,
        coordinator,
    });

    // CORS policy from configuration
    let cors = match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    // Create API routes
    let api_routes = create_api_routes(state.clone());

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", api_routes)
        // Mount the WebSocket endpoint
        .merge(
            Router::new()
                .route("/ws", get(websocket_handler))
                .with_state(state),
        )
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start the HTTP/WebSocket server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!(
        "📡 WebSocket available at ws://{}/ws",
        config.server_address()
    );
    info!(
        "📚 Swagger UI available at http://{}/swagger",
        config.server_address()
    );

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
