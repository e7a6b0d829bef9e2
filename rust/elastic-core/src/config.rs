// rust/elastic-core/src/config.rs

//! Configuration management for the elastic agent.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, rendezvous option strings (`key=value,...`), and
//! validation of configuration values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::redirects::Redirects;
use crate::error::{ElasticError, Result};

// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub rendezvous: RendezvousConfig,
    pub worker: WorkerConfig,
    pub logging: LogConfig,
    pub retry: RetrySettings,
}

/// Rendezvous backend type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendezvousBackendType {
    /// Fixed membership, node rank supplied by the launcher.
    #[default]
    Static,
    /// In-process rendezvous store (standalone, single host).
    Local,
    /// Remote `dtr-rendezvous` server reached over gRPC.
    Grpc,
}

impl FromStr for RendezvousBackendType {
    type Err = ElasticError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "local" | "standalone" => Ok(Self::Local),
            "grpc" => Ok(Self::Grpc),
            other => Err(ElasticError::config(format!(
                "unknown rendezvous backend '{}' (expected static, local or grpc)",
                other
            ))),
        }
    }
}

/// How membership changes are charged against the restart budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChangePolicy {
    /// A superseded round consumes one restart, like a worker failure.
    #[default]
    CountAsRestart,
    /// A superseded round restarts the group without consuming a restart.
    Exempt,
}

/// Rendezvous configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
    /// Backend type: "static", "local" or "grpc".
    pub backend: RendezvousBackendType,
    /// `host:port` of the rendezvous server (grpc backend).
    pub endpoint: String,
    /// Run id shared by every node of the job.
    pub run_id: String,
    pub min_nodes: u32,
    pub max_nodes: u32,
    /// Ceiling on the time spent waiting for a quorum.
    pub join_timeout_ms: u64,
    /// Extra time a round stays open after `min_nodes` joined.
    pub last_call_timeout_ms: u64,
    /// Interval at which this node renews its liveness lease.
    pub keep_alive_interval_ms: u64,
    /// Lease lifetime used by the in-process store.
    pub lease_ttl_ms: u64,
    /// gRPC connect timeout.
    pub connect_timeout_ms: u64,
    /// gRPC timeout for calls that do not block on a quorum.
    pub request_timeout_ms: u64,
    /// Address other nodes use to reach this node; the hostname when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_addr: Option<String>,
    /// Node rank for the static backend.
    pub node_rank: u32,
    /// Master address for the static backend.
    pub master_addr: String,
    /// Master port for the static backend, and the port node 0 advertises
    /// when non-zero.
    pub master_port: u16,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            backend: RendezvousBackendType::Static,
            endpoint: String::new(),
            run_id: "none".to_string(),
            min_nodes: 1,
            max_nodes: 1,
            join_timeout_ms: 600_000,
            last_call_timeout_ms: 30_000,
            keep_alive_interval_ms: 5_000,
            lease_ttl_ms: 30_000,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            local_addr: None,
            node_rank: 0,
            master_addr: "127.0.0.1".to_string(),
            master_port: 29500,
        }
    }
}

impl RendezvousConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn last_call_timeout(&self) -> Duration {
        Duration::from_millis(self.last_call_timeout_ms)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(self.keep_alive_interval_ms)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_millis(self.lease_ttl_ms)
    }

    /// Apply `key=value` rendezvous options. Durations are given in seconds.
    pub fn apply_options(&mut self, options: &HashMap<String, String>) -> Result<()> {
        for (key, value) in options {
            match key.as_str() {
                "join_timeout" => self.join_timeout_ms = parse_seconds(key, value)?,
                "last_call_timeout" => self.last_call_timeout_ms = parse_seconds(key, value)?,
                "keep_alive_interval" => self.keep_alive_interval_ms = parse_seconds(key, value)?,
                "lease_ttl" => self.lease_ttl_ms = parse_seconds(key, value)?,
                "rank" | "node_rank" => {
                    self.node_rank = value.parse().map_err(|e| {
                        ElasticError::config_with_source(format!("invalid {} '{}'", key, value), e)
                    })?
                }
                "local_addr" => self.local_addr = Some(value.clone()),
                _ => {
                    tracing::warn!(option = %key, "ignoring unknown rendezvous option");
                }
            }
        }
        Ok(())
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<u64> {
    let seconds: f64 = value.parse().map_err(|e| {
        ElasticError::config_with_source(format!("invalid {} '{}'", key, value), e)
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ElasticError::config(format!(
            "{} must be a non-negative number of seconds",
            key
        )));
    }
    Ok((seconds * 1000.0).round() as u64)
}

/// Parse a rendezvous option string of the form `key1=v1,key2=v2`.
pub fn parse_rendezvous_options(options: &str) -> Result<HashMap<String, String>> {
    let mut parsed = HashMap::new();
    for item in options.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = item.split_once('=').ok_or_else(|| {
            ElasticError::config(format!(
                "rendezvous option '{}' is not in key=value form",
                item
            ))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ElasticError::config(format!(
                "rendezvous option '{}' has an empty key",
                item
            )));
        }
        parsed.insert(key.to_string(), value.trim().to_string());
    }
    Ok(parsed)
}

/// Parse a node count of the form `N` or `MIN:MAX`.
pub fn parse_min_max_nodes(nnodes: &str) -> Result<(u32, u32)> {
    let parse = |s: &str| {
        s.trim().parse::<u32>().map_err(|e| {
            ElasticError::config_with_source(format!("invalid node count '{}'", nnodes), e)
        })
    };
    let parts: Vec<&str> = nnodes.split(':').collect();
    match parts.as_slice() {
        [n] => {
            let n = parse(n)?;
            Ok((n, n))
        }
        [min, max] => Ok((parse(min)?, parse(max)?)),
        _ => Err(ElasticError::config(format!(
            "nnodes={} is not in \"MIN:MAX\" format",
            nnodes
        ))),
    }
}

// Worker group options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    // Logical function of the workers, e.g. "trainer".
    pub role: String,
    // Workers per node, identical on every node.
    pub local_world_size: u32,
    // Number of whole-group restarts allowed before giving up.
    pub max_restarts: u32,
    // Interval between liveness and membership checks.
    pub monitor_interval_ms: u64,
    // Time workers get to exit after SIGTERM before they are killed.
    pub termination_grace_ms: u64,
    // Time a successful node waits for its peers to finish.
    pub exit_barrier_timeout_ms: u64,
    pub membership_changes: MembershipChangePolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            role: "default".to_string(),
            local_world_size: 1,
            max_restarts: 3,
            monitor_interval_ms: 5_000,
            termination_grace_ms: 30_000,
            exit_barrier_timeout_ms: 300_000,
            membership_changes: MembershipChangePolicy::CountAsRestart,
        }
    }
}

impl WorkerConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    pub fn exit_barrier_timeout(&self) -> Duration {
        Duration::from_millis(self.exit_barrier_timeout_ms)
    }
}

// Worker output redirection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // Base directory for worker log files. Each agent writes under its own
    // `<run_id>_<suffix>` subdirectory; a temp directory is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    // Streams to redirect, e.g. "3" or "0:1,1:2".
    pub redirects: String,
    // Streams written to the log file and the console, same syntax.
    pub tee: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            redirects: "0".to_string(),
            tee: "0".to_string(),
        }
    }
}

/// Backoff settings for transient rendezvous backend errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
        }
    }
}

impl FromStr for AgentConfig {
    type Err = ElasticError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| ElasticError::config_with_source("failed to parse TOML config", e))
    }
}

impl AgentConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ElasticError::config_with_source(
                format!("failed to read config file '{}'", path.display()),
                e,
            )
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `DTR_`. For example:
    // - `DTR_RDZV_BACKEND` overrides `rendezvous.backend`
    // - `DTR_RDZV_ENDPOINT` overrides `rendezvous.endpoint`
    // - `DTR_RDZV_ID` overrides `rendezvous.run_id`
    // - `DTR_NNODES` overrides `rendezvous.min_nodes`/`max_nodes` ("MIN:MAX")
    // - `DTR_MAX_RESTARTS` overrides `worker.max_restarts`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Rendezvous overrides
        if let Ok(val) = std::env::var("DTR_RDZV_BACKEND") {
            if let Ok(backend) = val.parse() {
                self.rendezvous.backend = backend;
            }
        }
        if let Ok(val) = std::env::var("DTR_RDZV_ENDPOINT") {
            self.rendezvous.endpoint = val;
        }
        if let Ok(val) = std::env::var("DTR_RDZV_ID") {
            self.rendezvous.run_id = val;
        }
        if let Ok(val) = std::env::var("DTR_NNODES") {
            if let Ok((min, max)) = parse_min_max_nodes(&val) {
                self.rendezvous.min_nodes = min;
                self.rendezvous.max_nodes = max;
            }
        }
        if let Ok(val) = std::env::var("DTR_RDZV_JOIN_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                self.rendezvous.join_timeout_ms = v;
            }
        }
        if let Ok(val) = std::env::var("DTR_RDZV_LAST_CALL_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                self.rendezvous.last_call_timeout_ms = v;
            }
        }
        if let Ok(val) = std::env::var("DTR_NODE_RANK") {
            if let Ok(v) = val.parse() {
                self.rendezvous.node_rank = v;
            }
        }
        if let Ok(val) = std::env::var("DTR_MASTER_ADDR") {
            self.rendezvous.master_addr = val;
        }
        if let Ok(val) = std::env::var("DTR_MASTER_PORT") {
            if let Ok(v) = val.parse() {
                self.rendezvous.master_port = v;
            }
        }

        // Worker overrides
        if let Ok(val) = std::env::var("DTR_ROLE") {
            self.worker.role = val;
        }
        if let Ok(val) = std::env::var("DTR_NPROC_PER_NODE") {
            if let Ok(v) = val.parse() {
                self.worker.local_world_size = v;
            }
        }
        if let Ok(val) = std::env::var("DTR_MAX_RESTARTS") {
            if let Ok(v) = val.parse() {
                self.worker.max_restarts = v;
            }
        }
        if let Ok(val) = std::env::var("DTR_MONITOR_INTERVAL_MS") {
            if let Ok(v) = val.parse() {
                self.worker.monitor_interval_ms = v;
            }
        }

        // Logging overrides
        if let Ok(val) = std::env::var("DTR_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("DTR_REDIRECTS") {
            self.logging.redirects = val;
        }
        if let Ok(val) = std::env::var("DTR_TEE") {
            self.logging.tee = val;
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        let rdzv = &self.rendezvous;
        if rdzv.min_nodes == 0 {
            return Err(ElasticError::config(
                "rendezvous.min_nodes must be greater than 0",
            ));
        }
        if rdzv.min_nodes > rdzv.max_nodes {
            return Err(ElasticError::config(format!(
                "rendezvous.min_nodes ({}) must not exceed rendezvous.max_nodes ({})",
                rdzv.min_nodes, rdzv.max_nodes
            )));
        }
        if rdzv.run_id.is_empty() {
            return Err(ElasticError::config("rendezvous.run_id must not be empty"));
        }
        if rdzv.join_timeout_ms == 0 {
            return Err(ElasticError::config(
                "rendezvous.join_timeout_ms must be greater than 0",
            ));
        }
        if rdzv.keep_alive_interval_ms == 0 {
            return Err(ElasticError::config(
                "rendezvous.keep_alive_interval_ms must be greater than 0",
            ));
        }
        if rdzv.lease_ttl_ms <= rdzv.keep_alive_interval_ms {
            return Err(ElasticError::config(
                "rendezvous.lease_ttl_ms must be longer than rendezvous.keep_alive_interval_ms",
            ));
        }
        match rdzv.backend {
            RendezvousBackendType::Grpc if rdzv.endpoint.is_empty() => {
                return Err(ElasticError::config(
                    "rendezvous.endpoint is required when backend is 'grpc'",
                ));
            }
            RendezvousBackendType::Static => {
                if rdzv.min_nodes != rdzv.max_nodes {
                    return Err(ElasticError::config(
                        "the static backend requires min_nodes == max_nodes",
                    ));
                }
                if rdzv.node_rank >= rdzv.max_nodes {
                    return Err(ElasticError::config(format!(
                        "rendezvous.node_rank ({}) must be less than the node count ({})",
                        rdzv.node_rank, rdzv.max_nodes
                    )));
                }
                // Every node derives MASTER_PORT from this value.
                if rdzv.master_port == 0 {
                    return Err(ElasticError::config(
                        "the static backend requires a non-zero rendezvous.master_port",
                    ));
                }
            }
            _ => {}
        }

        if self.worker.local_world_size == 0 {
            return Err(ElasticError::config(
                "worker.local_world_size must be greater than 0",
            ));
        }
        if self.worker.monitor_interval_ms == 0 {
            return Err(ElasticError::config(
                "worker.monitor_interval_ms must be greater than 0",
            ));
        }
        if self.worker.role.is_empty() {
            return Err(ElasticError::config("worker.role must not be empty"));
        }

        self.logging.redirects.parse::<Redirects>()?;
        self.logging.tee.parse::<Redirects>()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();

        assert_eq!(config.rendezvous.backend, RendezvousBackendType::Static);
        assert_eq!(config.rendezvous.min_nodes, 1);
        assert_eq!(config.rendezvous.max_nodes, 1);
        assert_eq!(config.rendezvous.master_port, 29500);
        assert_eq!(config.worker.role, "default");
        assert_eq!(config.worker.max_restarts, 3);
        assert_eq!(config.worker.monitor_interval(), Duration::from_secs(5));
        assert_eq!(
            config.worker.membership_changes,
            MembershipChangePolicy::CountAsRestart
        );
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_default_validates() {
        assert!(AgentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_str_partial() {
        let toml = r#"
            [rendezvous]
            backend = "grpc"
            endpoint = "rdzv.internal:29400"
            run_id = "job-42"
            min_nodes = 2
            max_nodes = 4

            [worker]
            local_world_size = 8
            membership_changes = "exempt"
        "#;
        let config: AgentConfig = toml.parse().unwrap();

        assert_eq!(config.rendezvous.backend, RendezvousBackendType::Grpc);
        assert_eq!(config.rendezvous.endpoint, "rdzv.internal:29400");
        assert_eq!(config.rendezvous.min_nodes, 2);
        assert_eq!(config.rendezvous.max_nodes, 4);
        assert_eq!(config.worker.local_world_size, 8);
        assert_eq!(config.worker.membership_changes, MembershipChangePolicy::Exempt);
        // Untouched fields keep their defaults
        assert_eq!(config.worker.max_restarts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result: std::result::Result<AgentConfig, _> = "invalid = [".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [worker]
            role = "trainer"
            "#
        )
        .unwrap();

        let config = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.worker.role, "trainer");
    }

    #[test]
    fn test_from_file_not_found() {
        assert!(AgentConfig::from_file("/nonexistent/agent.toml").is_err());
    }

    #[test]
    fn test_validate_min_exceeds_max() {
        let mut config = AgentConfig::default();
        config.rendezvous.backend = RendezvousBackendType::Local;
        config.rendezvous.min_nodes = 3;
        config.rendezvous.max_nodes = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn test_validate_grpc_requires_endpoint() {
        let mut config = AgentConfig::default();
        config.rendezvous.backend = RendezvousBackendType::Grpc;
        assert!(config.validate().is_err());
        config.rendezvous.endpoint = "localhost:29400".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_static_requires_fixed_size() {
        let mut config = AgentConfig::default();
        config.rendezvous.max_nodes = 2;
        assert!(config.validate().is_err());

        config.rendezvous.min_nodes = 2;
        config.rendezvous.node_rank = 2;
        assert!(config.validate().is_err());

        config.rendezvous.node_rank = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_static_requires_master_port() {
        let mut config = AgentConfig::default();
        config.rendezvous.master_port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("master_port"));

        // Other backends pick a free port instead.
        config.rendezvous.backend = RendezvousBackendType::Local;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_streams() {
        let mut config = AgentConfig::default();
        config.logging.tee = "0:1,1:3".to_string();
        assert!(config.validate().is_ok());

        config.logging.tee = "5".to_string();
        assert!(config.validate().is_err());

        config.logging.tee = "0".to_string();
        config.logging.redirects = "x".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_local_world_size() {
        let mut config = AgentConfig::default();
        config.worker.local_world_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_lease_longer_than_keep_alive() {
        let mut config = AgentConfig::default();
        config.rendezvous.lease_ttl_ms = config.rendezvous.keep_alive_interval_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_min_max_nodes() {
        assert_eq!(parse_min_max_nodes("4").unwrap(), (4, 4));
        assert_eq!(parse_min_max_nodes("1:3").unwrap(), (1, 3));
        assert!(parse_min_max_nodes("1:2:3").is_err());
        assert!(parse_min_max_nodes("a:b").is_err());
    }

    #[test]
    fn test_parse_rendezvous_options() {
        let options = parse_rendezvous_options("join_timeout=90, last_call_timeout=0.5,,").unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options["join_timeout"], "90");

        assert!(parse_rendezvous_options("no_equals_sign").is_err());
        assert!(parse_rendezvous_options("=value").is_err());
        assert!(parse_rendezvous_options("").unwrap().is_empty());
    }

    #[test]
    fn test_apply_rendezvous_options() {
        let mut rdzv = RendezvousConfig::default();
        let options = parse_rendezvous_options("join_timeout=90,last_call_timeout=0.5,rank=1").unwrap();
        rdzv.apply_options(&options).unwrap();

        assert_eq!(rdzv.join_timeout(), Duration::from_secs(90));
        assert_eq!(rdzv.last_call_timeout(), Duration::from_millis(500));
        assert_eq!(rdzv.node_rank, 1);

        let bad = parse_rendezvous_options("join_timeout=-1").unwrap();
        assert!(rdzv.apply_options(&bad).is_err());
    }

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!(
            "standalone".parse::<RendezvousBackendType>().unwrap(),
            RendezvousBackendType::Local
        );
        assert_eq!(
            "GRPC".parse::<RendezvousBackendType>().unwrap(),
            RendezvousBackendType::Grpc
        );
        assert!("etcd".parse::<RendezvousBackendType>().is_err());
    }

    // Environment variables are global state, so every override case lives in
    // one test.
    #[test]
    fn test_env_overrides() {
        for (key, _) in std::env::vars() {
            if key.starts_with("DTR_") {
                std::env::remove_var(&key);
            }
        }

        std::env::set_var("DTR_RDZV_BACKEND", "grpc");
        std::env::set_var("DTR_RDZV_ENDPOINT", "10.0.0.1:29400");
        std::env::set_var("DTR_NNODES", "2:8");
        std::env::set_var("DTR_MAX_RESTARTS", "not_a_number");
        std::env::set_var("DTR_TEE", "1");

        let config = AgentConfig::default().with_env_overrides();
        assert_eq!(config.rendezvous.backend, RendezvousBackendType::Grpc);
        assert_eq!(config.rendezvous.endpoint, "10.0.0.1:29400");
        assert_eq!(config.rendezvous.min_nodes, 2);
        assert_eq!(config.rendezvous.max_nodes, 8);
        // Invalid values keep the default
        assert_eq!(config.worker.max_restarts, 3);
        assert_eq!(config.logging.tee, "1");

        for key in [
            "DTR_RDZV_BACKEND",
            "DTR_RDZV_ENDPOINT",
            "DTR_NNODES",
            "DTR_MAX_RESTARTS",
            "DTR_TEE",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_serialize_roundtrip() {
        let original = AgentConfig::default();
        let toml_str = toml::to_string(&original).unwrap();
        let parsed: AgentConfig = toml_str.parse().unwrap();

        assert_eq!(original.rendezvous.run_id, parsed.rendezvous.run_id);
        assert_eq!(original.worker.max_restarts, parsed.worker.max_restarts);
        assert_eq!(original.logging.redirects, parsed.logging.redirects);
    }
}
