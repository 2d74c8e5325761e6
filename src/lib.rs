pub mod barcode;
pub mod bins;
pub mod codes;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;
pub mod store;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use barcode::BARCODE_URL_PREFIX;
use state::AppState;

pub fn create_router(state: AppState) -> Router {
    let barcode_files = ServeDir::new(state.barcodes.dir());

    Router::new()
        .route("/", get(handlers::health))
        // Auth
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        // Warehouses
        .route(
            "/api/warehouses",
            get(handlers::warehouses::list_warehouses).post(handlers::warehouses::create_warehouse),
        )
        .route("/api/warehouses/:id", get(handlers::warehouses::get_warehouse))
        .route("/api/warehouses/:id/bins", get(handlers::warehouses::bin_layout))
        .route("/api/warehouses/:id/bins/resolve", post(handlers::warehouses::resolve_bin))
        .route(
            "/api/warehouses/:id/bins/:address/barcode",
            get(handlers::warehouses::bin_barcode),
        )
        // Assets
        .route(
            "/api/assets",
            get(handlers::assets::list_assets).post(handlers::assets::create_asset),
        )
        .route("/api/assets/:id", get(handlers::assets::get_asset))
        .route("/api/assets/:id/location", put(handlers::assets::assign_location))
        // Barcodes
        .route("/api/barcodes/:payload", get(handlers::barcodes::get_barcode))
        .nest_service(BARCODE_URL_PREFIX, barcode_files)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)), // images arrive inline as data URLs
        )
        .with_state(state)
}
