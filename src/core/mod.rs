pub mod config;
pub mod models;
pub mod secrets;
pub mod state;
