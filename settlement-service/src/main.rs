use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{info, warn};

use settlement_service::app::build_router;
use settlement_service::config::SettlementConfig;
use settlement_service::settlement::{MemorySettlementStore, PgSettlementStore, SettlementStore};
use settlement_service::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = Arc::new(SettlementConfig::from_env()?);
    let configured: Vec<&str> = [
        config.payu.as_ref().map(|_| "payu"),
        config.razorpay.as_ref().map(|_| "razorpay"),
        config.phonepe.as_ref().map(|_| "phonepe"),
        config.paytm.as_ref().map(|_| "paytm"),
    ]
    .into_iter()
    .flatten()
    .collect();
    info!(gateways = ?configured, "gateway credentials loaded");

    let store: Arc<dyn SettlementStore> = match env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(5))
                .connect(&url)
                .await
                .context("failed to connect to Postgres")?;
            Arc::new(PgSettlementStore::new(
                pool,
                Duration::from_millis(config.persist_timeout_ms),
            ))
        }
        Err(_) => {
            warn!("DATABASE_URL not set; using in-memory settlement store");
            Arc::new(MemorySettlementStore::new())
        }
    };

    let app = build_router(AppState { store, config });

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8087".to_string())
        .parse()?;
    let addr = SocketAddr::new(host.parse()?, port);
    info!(%addr, "starting settlement-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
