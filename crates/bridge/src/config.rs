// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the lookout bridge.
#[derive(Debug, Clone, clap::Args)]
pub struct BridgeConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "LOOKOUT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9515, env = "LOOKOUT_PORT")]
    pub port: u16,

    /// Console log buffer capacity.
    #[arg(long, default_value_t = 1000, env = "LOOKOUT_LOG_CAPACITY")]
    pub log_capacity: usize,

    /// Network body buffer capacity.
    #[arg(long, default_value_t = 500, env = "LOOKOUT_NETWORK_CAPACITY")]
    pub network_capacity: usize,

    /// WebSocket event buffer capacity.
    #[arg(long, default_value_t = 500, env = "LOOKOUT_WS_CAPACITY")]
    pub ws_capacity: usize,

    /// User action buffer capacity.
    #[arg(long, default_value_t = 500, env = "LOOKOUT_ACTION_CAPACITY")]
    pub action_capacity: usize,

    /// Performance snapshot buffer capacity.
    #[arg(long, default_value_t = 200, env = "LOOKOUT_PERF_CAPACITY")]
    pub perf_capacity: usize,

    /// TTL in seconds for buffered records; 0 disables expiry.
    #[arg(long, default_value_t = 0, env = "LOOKOUT_BUFFER_TTL_SECS")]
    pub buffer_ttl_secs: u64,

    /// Max outstanding pending queries before new ones are rejected.
    #[arg(long, default_value_t = 32, env = "LOOKOUT_MAX_PENDING")]
    pub max_pending: usize,

    /// Default timeout for extension-serviced queries, in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "LOOKOUT_QUERY_TIMEOUT_MS")]
    pub query_timeout_ms: u64,

    /// Admission gate threshold in events per second.
    #[arg(long, default_value_t = 1000, env = "LOOKOUT_ADMISSION_LIMIT")]
    pub admission_limit: u32,

    /// Memory sweep interval in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "LOOKOUT_MEMORY_CHECK_MS")]
    pub memory_check_ms: u64,

    /// Pending-query reaper interval in milliseconds.
    #[arg(long, default_value_t = 1000, env = "LOOKOUT_REAPER_MS")]
    pub reaper_ms: u64,

    /// Max active WebSocket connections tracked before the oldest is evicted.
    #[arg(long, default_value_t = 50, env = "LOOKOUT_MAX_CONNECTIONS")]
    pub max_connections: usize,

    /// Closed WebSocket connections kept in history.
    #[arg(long, default_value_t = 20, env = "LOOKOUT_MAX_CLOSED_CONNECTIONS")]
    pub max_closed_connections: usize,

    /// Allow browser-side navigation and script execution verbs.
    #[arg(long, env = "LOOKOUT_ALLOW_PILOT")]
    pub allow_pilot: bool,

    /// Log file path. If unset, logs go to stderr.
    #[arg(long, env = "LOOKOUT_LOG_FILE")]
    pub log_file: Option<std::path::PathBuf>,

    /// Rotate the log file at startup once it exceeds this many MiB.
    #[arg(long, default_value_t = 10, env = "LOOKOUT_LOG_ROTATE_MB")]
    pub log_rotate_mb: u64,
}

impl BridgeConfig {
    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.query_timeout_ms)
    }

    pub fn memory_check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.memory_check_ms)
    }

    pub fn reaper_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reaper_ms)
    }

    pub fn buffer_ttl_ms(&self) -> u64 {
        self.buffer_ttl_secs * 1000
    }
}
