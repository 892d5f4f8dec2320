pub mod api;
pub mod app;
pub mod config;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod routing;
pub mod services;
pub mod state;
