use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use turnstile_server::config::Config;
use turnstile_server::events::BroadcastSink;
use turnstile_server::routes::create_routes;
use turnstile_server::services::sweeper;
use turnstile_server::state::AppState;
use turnstile_server::token::HmacSigner;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let state = AppState {
        pool: pool.clone(),
        signer: Arc::new(HmacSigner::new(config.qr_signing_secret.clone())),
        events: Arc::new(BroadcastSink::new(256)),
        config: config.clone(),
    };

    sweeper::spawn(pool, state.events.clone(), config.sweep_interval);

    let app = create_routes(state);

    tracing::info!("Server running at http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
