//! Halal Marketplace backend
//!
//! Certification lifecycle for halal products: vendors list products,
//! certifiers issue and transition certifications, anyone can verify a
//! certificate number or follow a product's supply chain trail. Ledger,
//! content storage, email and language-model integrations are best effort.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod extract;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::ServiceContext;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: ServiceContext,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(services: ServiceContext, config: Config) -> Self {
        Self {
            services,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Halal Marketplace API"
}
