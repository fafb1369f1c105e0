mod config;
mod db;
mod error;
mod models;
mod services;
mod socket;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::socket::broadcast::{Broadcaster, WsBroadcaster};
use crate::socket::{ChatServer, RoomRegistry};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub registry: RoomRegistry,
    pub connections: Arc<WsBroadcaster>,
    pub chat: Arc<ChatServer>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_level = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Parlor chat server");

    let config = Config::from_env()?;
    info!("Configuration loaded from environment");

    let db = Database::new(&config.database_url).await?;
    info!("Database connected");

    db.run_migrations().await?;

    let registry = RoomRegistry::new();
    let connections = Arc::new(WsBroadcaster::new(registry.clone()));
    let broadcaster: Arc<dyn Broadcaster> = connections.clone();
    let chat = Arc::new(ChatServer::new(
        db.clone(),
        registry.clone(),
        broadcaster,
        config.s3.clone(),
    ));

    let state = web::Data::new(AppState {
        db,
        config: config.clone(),
        registry,
        connections,
        chat,
    });

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    info!("Server running at http://{}", addr);

    HttpServer::new(move || {
        // Credentials (the token cookie) rule out a wildcard origin, so
        // origins are allowed dynamically instead.
        let cors = Cors::default()
            .allowed_origin_fn(|_origin, _req_head| true)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .route("/health", web::get().to(health_check))
            .route("/health/db", web::get().to(health_check_db))
            .route("/ws", web::get().to(socket::transport::socket_route))
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}

async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let (sessions, rooms) = state.registry.counts().await;
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "sessions": sessions,
        "rooms": rooms,
    }))
}

async fn health_check_db(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    sqlx::query("SELECT 1")
        .execute(&state.db.pool)
        .await
        .map_err(AppError::Database)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({"status": "ok"})))
}
