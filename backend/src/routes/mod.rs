//! Route definitions for the Halal Marketplace

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/certifications", certification_routes(state))
        .nest("/products", product_routes(state))
}

/// Certification routes: verification is public, everything else needs a token
fn certification_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route(
        "/verify/:certificate_number",
        get(handlers::verify_certification),
    );

    let protected = Router::new()
        .route(
            "/",
            get(handlers::list_certifications).post(handlers::create_certification),
        )
        .route("/:id", get(handlers::get_certification))
        .route("/:id/status", put(handlers::update_certification_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    public.merge(protected)
}

/// Product routes: reads are public, writes need a token
fn product_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::list_products))
        .route("/:id", get(handlers::get_product))
        .route("/:id/ledger", get(handlers::get_product_ledger_status))
        .route(
            "/:id/supply-chain",
            get(handlers::list_supply_chain_events),
        );

    let protected = Router::new()
        .route("/", post(handlers::create_product))
        .route(
            "/:id",
            put(handlers::update_product).delete(handlers::delete_product),
        )
        .route("/:id/assessment", post(handlers::assess_product))
        .route(
            "/:id/supply-chain",
            post(handlers::record_supply_chain_event),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    public.merge(protected)
}
