pub mod auth;
pub mod config;
pub mod handlers;
pub mod inventory;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
