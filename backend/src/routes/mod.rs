//! Route definitions for the Garage Workshop Management Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public, except logout)
        .nest("/auth", auth_routes())
        // Protected routes - user administration
        .nest("/users", user_routes())
        // Protected routes - master data
        .nest("/categories", category_routes())
        .nest("/suppliers", supplier_routes())
        // Protected routes - spare-part inventory
        .nest("/spare-parts", spare_part_routes())
        // Protected routes - purchasing
        .nest("/purchases", purchase_routes())
        // Protected routes - visits and billing
        .nest("/visits", visit_routes())
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .merge(
            Router::new()
                .route("/logout", post(handlers::logout))
                .route_layer(middleware::from_fn(auth_middleware)),
        )
}

/// User administration routes (protected)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/me", get(handlers::get_me))
        .route(
            "/:user_id",
            get(handlers::get_user).put(handlers::update_user),
        )
        .route("/:user_id/password", put(handlers::reset_password))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Category routes (protected)
fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/:category_id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Spare-part inventory routes (protected)
fn spare_part_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_spare_parts).post(handlers::create_spare_part),
        )
        .route("/stats", get(handlers::get_inventory_stats))
        .route(
            "/:part_id",
            get(handlers::get_spare_part)
                .put(handlers::update_spare_part)
                .delete(handlers::delete_spare_part),
        )
        .route("/:part_id/adjust", post(handlers::adjust_stock))
        .route(
            "/:part_id/sell-prices",
            get(handlers::list_sell_prices).post(handlers::add_sell_price),
        )
        .route("/:part_id/audits", get(handlers::get_audit_trail))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Purchasing routes (protected)
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_purchase))
        .route("/batch", post(handlers::create_purchase_batch))
        // Group endpoints address the natural key via query parameters
        .route(
            "/groups",
            get(handlers::get_purchase_group)
                .put(handlers::update_purchase_group)
                .delete(handlers::delete_purchase_group),
        )
        .route("/groups/list", get(handlers::list_purchase_groups))
        .route("/:purchase_id", get(handlers::get_purchase))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Visit and billing routes (protected)
fn visit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_visits).post(handlers::create_visit))
        .route(
            "/:visit_id",
            get(handlers::get_visit).put(handlers::update_visit),
        )
        .route("/:visit_id/status", put(handlers::update_visit_status))
        .route("/:visit_id/diagnosis", put(handlers::set_diagnosis))
        .route(
            "/:visit_id/parts",
            get(handlers::list_part_usages).post(handlers::use_spare_part),
        )
        .route(
            "/:visit_id/parts/:usage_id",
            axum::routing::delete(handlers::remove_part_usage),
        )
        .route("/:visit_id/bill", get(handlers::get_visit_bill))
        .route_layer(middleware::from_fn(auth_middleware))
}
