// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Upper bound on exam codes generated in one request.
pub const DEFAULT_MAX_VARIANTS_PER_REQUEST: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub listen_addr: String,
    pub log_dir: String,
    pub max_variants_per_request: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let max_variants_per_request = env::var("MAX_VARIANTS_PER_REQUEST")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_VARIANTS_PER_REQUEST);

        Self {
            database_url,
            rust_log,
            listen_addr,
            log_dir,
            max_variants_per_request,
        }
    }
}
