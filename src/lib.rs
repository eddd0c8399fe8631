// src/lib.rs
pub mod config;
pub mod health;
pub mod metrics;
pub mod monitor;
pub mod server;
pub mod transport;
