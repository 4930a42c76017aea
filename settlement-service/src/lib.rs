use std::sync::Arc;

pub mod app;
pub mod callback_handlers;
pub mod callbacks;
pub mod config;
pub mod hash;
pub mod model;
pub mod resolve;
pub mod settlement;
pub mod verify;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn settlement::SettlementStore>,
    pub config: Arc<config::SettlementConfig>,
}
