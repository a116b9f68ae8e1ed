// Library interface for the binary and the integration tests

// Declare all modules
pub mod auth;
pub mod block;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod db;
pub mod editor;
pub mod error;
pub mod pages;
pub mod payment;
pub mod pipeline;
pub mod queries;
pub mod render;
pub mod schema;
pub mod search;
pub mod seed;
pub mod serve;
pub mod site;
pub mod views;

// Re-export the expected database version for convenience
pub use constants::EXPECTED_DB_VERSION;
pub use error::AppError;
