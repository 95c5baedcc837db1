// src/config.rs

use std::{env, net::SocketAddr, time::Duration};

use dotenvy::dotenv;
use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_TICK_MILLIS: u64 = 1000;
const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it exams and reports live in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    /// Base URL of the code execution sandbox.
    pub sandbox_url: Option<Url>,
    /// Real time of one countdown second.
    pub tick_period: Duration,
    /// How long a session without a running countdown survives untouched.
    pub session_idle_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.parse().expect("default bind address is valid"));

        let sandbox_url = env::var("SANDBOX_URL").ok().and_then(|v| match Url::parse(&v) {
            Ok(url) => Some(url),
            Err(e) => {
                eprintln!("Ignoring invalid SANDBOX_URL '{}': {}", v, e);
                None
            }
        });

        let tick_millis = env::var("TICK_MILLIS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_TICK_MILLIS);

        let session_idle_secs = env::var("SESSION_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            sandbox_url,
            tick_period: Duration::from_millis(tick_millis),
            session_idle_timeout: Duration::from_secs(session_idle_secs),
        }
    }
}
