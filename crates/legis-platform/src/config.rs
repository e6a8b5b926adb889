use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub redis_url: String,
    pub http_addr: String,
    pub sweep_interval_secs: u64,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;
        let http_addr =
            std::env::var("HTTP_ADDR").unwrap_or_else(|_| default_http_addr.to_string());

        Ok(Self {
            database_url,
            redis_url,
            http_addr,
            sweep_interval_secs: default_sweep_interval()?,
        })
    }

    pub fn worker_from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL is required")?;

        Ok(Self {
            database_url,
            redis_url,
            http_addr: String::new(),
            sweep_interval_secs: default_sweep_interval()?,
        })
    }
}

fn default_sweep_interval() -> Result<u64> {
    match std::env::var("SWEEP_INTERVAL_SECS") {
        Ok(value) => value
            .parse::<u64>()
            .context("SWEEP_INTERVAL_SECS must be a number of seconds"),
        // the dashboard refresh expects figures no staler than 30 seconds
        Err(_) => Ok(30),
    }
}
