pub mod admin;
pub mod app;
pub mod config;
pub mod discount;
pub mod errors;
pub mod game;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod timing;
pub mod ui;
pub mod validation;

pub use app::router;
pub use config::Config;
pub use state::AppState;
