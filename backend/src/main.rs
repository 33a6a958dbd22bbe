use std::net::SocketAddr;

use axum::{
    http::Method,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod db;
mod domain;
mod rest;

use domain::BookingPolicy;
use rest::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Setting up database");
    let db = db::DbConnection::init().await?;

    let state = AppState::new(db, BookingPolicy::default());

    // The public booking page is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    // Public booking-link routes
    let booking_routes = Router::new()
        .route("/:tenant/services", get(rest::list_services))
        .route("/:tenant/schedule", get(rest::get_schedule))
        .route("/:tenant/days", get(rest::list_selectable_days))
        .route("/:tenant/slots", get(rest::list_slots))
        .route("/:tenant/appointments", post(rest::create_appointment));

    // Tenant dashboard routes
    let tenant_routes = Router::new()
        .route("/:tenant/appointments", get(rest::list_appointments))
        .route("/:tenant/appointments/:id/status", post(rest::update_appointment_status))
        .route("/:tenant/schedule", put(rest::replace_schedule))
        .route("/:tenant/services", post(rest::create_service));

    let app = Router::new()
        .nest("/api/booking", booking_routes)
        .nest("/api/tenants", tenant_routes)
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = std::env::var("SLOTBOOK_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
