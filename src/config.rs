//! Application configuration from environment variables

use anyhow::Result;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub serve_static_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()?,
            allowed_origins: std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".into()),
            serve_static_dir: std::env::var("SERVE_STATIC_DIR").ok(),
        })
    }
}
