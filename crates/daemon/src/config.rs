//! Daemon configuration from `COURIER_*` environment variables

use anyhow::{bail, Context, Result};
use courier_core::application::worker::constants::{
    DEFAULT_RETRY_DELAY, DEFAULT_VISIBILITY_TIMEOUT, DEFAULT_WORKER_COUNT, IDLE_SLEEP_DURATION,
};
use courier_core::application::{PoolConfig, WorkerConfig};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.courier/queue.db";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9530;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub workers: usize,
    pub visibility_timeout: Duration,
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub shutdown_timeout: Duration,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take defaults,
    /// malformed values are an error
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("COURIER_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&db_path).into_owned();

        let workers = parse_or(&lookup, "COURIER_WORKERS", DEFAULT_WORKER_COUNT)?;
        if workers == 0 {
            bail!("COURIER_WORKERS must be at least 1");
        }

        let visibility_timeout = secs_or(
            &lookup,
            "COURIER_VISIBILITY_TIMEOUT_SECS",
            DEFAULT_VISIBILITY_TIMEOUT,
        )?;
        let http_timeout = secs_or(&lookup, "COURIER_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT)?;
        // A window that expires mid-request hands the message to a second worker
        if visibility_timeout <= http_timeout {
            bail!(
                "COURIER_VISIBILITY_TIMEOUT_SECS ({}) must be greater than COURIER_HTTP_TIMEOUT_SECS ({})",
                visibility_timeout.as_secs(),
                http_timeout.as_secs()
            );
        }

        Ok(Self {
            db_path,
            workers,
            visibility_timeout,
            retry_delay: secs_or(&lookup, "COURIER_RETRY_DELAY_SECS", DEFAULT_RETRY_DELAY)?,
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "COURIER_POLL_INTERVAL_MS",
                IDLE_SLEEP_DURATION.as_millis() as u64,
            )?),
            http_timeout,
            rpc_host: lookup("COURIER_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            rpc_port: parse_or(&lookup, "COURIER_RPC_PORT", DEFAULT_RPC_PORT)?,
            shutdown_timeout: secs_or(
                &lookup,
                "COURIER_SHUTDOWN_TIMEOUT_SECS",
                DEFAULT_SHUTDOWN_TIMEOUT,
            )?,
        })
    }

    /// sqlx connection URL for `db_path`
    pub fn database_url(&self) -> String {
        if self.db_path.starts_with("sqlite:") {
            self.db_path.clone()
        } else {
            format!("sqlite://{}", self.db_path)
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
            worker: WorkerConfig {
                retry_delay: self.retry_delay,
                poll_interval: self.poll_interval,
                ..WorkerConfig::default()
            },
        }
    }
}

pub fn log_format() -> LogFormat {
    match std::env::var("COURIER_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn secs_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}
