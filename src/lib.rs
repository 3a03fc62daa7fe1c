pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod util;

pub use config::Config;
pub use db::AppState;
