//! Route definitions for the Storefront API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Gateway callback (public, always acknowledged)
        .route("/payments/mobile/callback", post(handlers::payment_callback))
        // Protected routes
        .merge(order_routes(state.clone()))
        .nest("/inventory", inventory_routes(state.clone()))
        .nest("/payments/mobile", payment_routes(state))
}

/// Order routes (protected; POS sales require admin)
fn order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", post(handlers::create_order))
        .route("/orders/:order_id", get(handlers::get_order))
        .route("/pos/sales", post(handlers::create_pos_sale))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock ledger routes (protected; writes and ledger views require admin)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/variants/:variant_id/receive",
            post(handlers::receive_stock),
        )
        .route(
            "/variants/:variant_id/ledger",
            get(handlers::get_variant_ledger),
        )
        .route(
            "/bundles/:product_id/stock",
            get(handlers::get_bundle_stock),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Mobile-money routes (protected)
fn payment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::initiate_mobile_payment))
        .route("/:checkout_id", get(handlers::get_payment_status))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
