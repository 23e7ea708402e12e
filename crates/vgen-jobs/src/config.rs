//! Dispatcher configuration.

use std::time::Duration;

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum execution units running at once
    pub max_concurrent_jobs: usize,
    /// Accepted jobs waiting for a slot before submissions are rejected
    pub queue_capacity: usize,
    /// Per-job deadline; `None` lets a job run until its collaborators return
    pub job_timeout: Option<Duration>,
    /// How long terminal jobs are kept; `None` keeps them for the process lifetime
    pub retention_ttl: Option<Duration>,
    /// How often the retention sweeper runs
    pub retention_sweep_interval: Duration,
    /// Graceful shutdown timeout for in-flight jobs
    pub shutdown_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            queue_capacity: 64,
            job_timeout: None,
            retention_ttl: None,
            retention_sweep_interval: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl DispatcherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse_u64 = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let parse_usize = |key: &str| {
            lookup(key)
                .and_then(|s| s.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
        };

        Self {
            max_concurrent_jobs: parse_usize("VGEN_MAX_CONCURRENT_JOBS")
                .unwrap_or(defaults.max_concurrent_jobs),
            queue_capacity: parse_usize("VGEN_QUEUE_CAPACITY").unwrap_or(defaults.queue_capacity),
            job_timeout: parse_u64("VGEN_JOB_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            retention_ttl: parse_u64("VGEN_RETENTION_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            retention_sweep_interval: parse_u64("VGEN_RETENTION_SWEEP_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.retention_sweep_interval),
            shutdown_timeout: parse_u64("VGEN_SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
        }
    }

    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn with_retention(mut self, ttl: Duration, sweep_interval: Duration) -> Self {
        self.retention_ttl = Some(ttl);
        self.retention_sweep_interval = sweep_interval;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
