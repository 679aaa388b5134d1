pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod exposition;
pub mod logging;
pub mod state;
pub mod tls;
