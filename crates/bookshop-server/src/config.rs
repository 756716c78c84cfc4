use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::TimeDelta;

use bookshop_store::{DEFAULT_MAX_ROWS, StoreConfig};

/// Session secrets shipped in sample `.env` files. Refused at startup.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "complex_password_at_least_32_characters_long",
];

const MIN_SECRET_LEN: usize = 32;

pub struct Config {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub max_rows: usize,
    pub session_secret: String,
    pub secure_cookies: bool,
    pub session_ttl: TimeDelta,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let session_secret = var("BOOKSHOP_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("BOOKSHOP_SESSION_SECRET is unset or still a placeholder");
        }
        if session_secret.len() < MIN_SECRET_LEN {
            bail!("BOOKSHOP_SESSION_SECRET must be at least {MIN_SECRET_LEN} characters");
        }

        let host = var("BOOKSHOP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("BOOKSHOP_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("BOOKSHOP_PORT")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("BOOKSHOP_HOST")?;

        let data_dir: PathBuf = var("BOOKSHOP_DATA_DIR")
            .unwrap_or_else(|| "./data".into())
            .into();
        let max_rows = match var("BOOKSHOP_MAX_ROWS") {
            Some(v) => v.parse().context("BOOKSHOP_MAX_ROWS")?,
            None => DEFAULT_MAX_ROWS,
        };
        let secure_cookies = match var("BOOKSHOP_SECURE_COOKIES") {
            Some(v) => v.parse().context("BOOKSHOP_SECURE_COOKIES")?,
            None => true,
        };
        let session_days: i64 = match var("BOOKSHOP_SESSION_DAYS") {
            Some(v) => v.parse().context("BOOKSHOP_SESSION_DAYS")?,
            None => 7,
        };
        if session_days < 1 {
            bail!("BOOKSHOP_SESSION_DAYS must be at least 1");
        }
        let session_ttl = TimeDelta::try_days(session_days)
            .context("BOOKSHOP_SESSION_DAYS is out of range")?;

        Ok(Self {
            addr,
            data_dir,
            max_rows,
            session_secret,
            secure_cookies,
            session_ttl,
        })
    }

    pub fn store(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir.clone(),
            max_rows: self.max_rows,
        }
    }
}
