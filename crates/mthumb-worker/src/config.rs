//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use mthumb_models::env::{env_parse, env_var};
use mthumb_models::{EncodingConfig, OrbitConfig, WorkerId};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Identity sent with every claim
    pub worker_id: WorkerId,
    /// Maximum concurrent job pipelines
    pub max_concurrent_jobs: usize,
    /// Interval of the polling trigger
    pub poll_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Parent directory of the per-attempt workspaces
    pub work_dir: PathBuf,
    /// Bind address of the health/status surface
    pub health_addr: String,
    /// Upper bound for the render and encode stages
    pub stage_timeout: Duration,
    /// Orbit render configuration
    pub orbit: OrbitConfig,
    /// Output encoding configuration
    pub encoding: EncodingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: WorkerId::generate(),
            max_concurrent_jobs: 3,
            poll_interval: Duration::from_millis(5000),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: PathBuf::from("/tmp/mthumb"),
            health_addr: "0.0.0.0:3001".to_string(),
            stage_timeout: Duration::from_secs(300),
            orbit: OrbitConfig::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Unset variables keep their defaults; a value that is set but does not
    /// parse is a configuration error.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            worker_id: env_var("WORKER_ID")
                .map(WorkerId::from_string)
                .unwrap_or(defaults.worker_id),
            max_concurrent_jobs: env_parse("WORKER_MAX_JOBS")?
                .unwrap_or(defaults.max_concurrent_jobs),
            poll_interval: env_parse("WORKER_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            shutdown_timeout: env_parse("WORKER_SHUTDOWN_TIMEOUT")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            work_dir: env_var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            health_addr: env_var("WORKER_HEALTH_ADDR").unwrap_or(defaults.health_addr),
            stage_timeout: env_parse("WORKER_STAGE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.stage_timeout),
            orbit: OrbitConfig::from_env()?,
            encoding: EncodingConfig::from_env()?,
        })
    }

    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_orbit(mut self, orbit: OrbitConfig) -> Self {
        self.orbit = orbit;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Parsed health bind address.
    pub fn health_socket_addr(&self) -> WorkerResult<SocketAddr> {
        self.health_addr.parse().map_err(|_| {
            WorkerError::config_error(format!(
                "WORKER_HEALTH_ADDR is not a socket address: '{}'",
                self.health_addr
            ))
        })
    }

    /// Validate everything that would otherwise fail on every job.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.worker_id.as_str().is_empty() {
            return Err(WorkerError::config_error("worker id must not be empty"));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(WorkerError::config_error("WORKER_MAX_JOBS must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(WorkerError::config_error(
                "WORKER_POLL_INTERVAL_MS must be positive",
            ));
        }
        if self.stage_timeout.is_zero() {
            return Err(WorkerError::config_error(
                "WORKER_STAGE_TIMEOUT_SECS must be positive",
            ));
        }
        self.health_socket_addr()?;
        self.orbit.validate()?;
        self.encoding.validate()?;
        Ok(())
    }
}
