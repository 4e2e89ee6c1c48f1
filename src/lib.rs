pub mod config;
pub mod errors;
pub mod models;
pub mod presentation;
pub mod services;
pub mod utils;
