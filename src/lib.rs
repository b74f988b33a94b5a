pub mod api;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod services;
pub mod state;
pub mod temporal;
