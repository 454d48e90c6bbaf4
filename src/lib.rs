pub mod ai;
pub mod auth;
pub mod authz;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod routes;
pub mod types;
pub mod validate;

pub use routes::app;
