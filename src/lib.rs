pub mod chat;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod flows;
pub mod models;
pub mod router;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testing;

use axum::extract::FromRef;

pub use error::{AppError, AppResult};

use router::SessionRouter;
use transport::WsChannel;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub router: SessionRouter,
    pub channel: WsChannel,
}
