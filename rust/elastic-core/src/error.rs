// rust/elastic-core/src/error.rs

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Exit code used when the restart budget was consumed by membership changes
/// rather than by a worker exiting with a code of its own.
pub const RESTARTS_EXHAUSTED_EXIT_CODE: i32 = 3;

/// Exit code used when no rendezvous round could be completed.
pub const RENDEZVOUS_FAILED_EXIT_CODE: i32 = 2;

/// Exit code used for every other fatal error.
pub const GENERIC_FAILURE_EXIT_CODE: i32 = 1;

#[derive(Error, Debug)]
pub enum ElasticError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Rendezvous for run '{run_id}' timed out after {timeout:?}: {detail}")]
    RendezvousTimeout {
        run_id: String,
        timeout: Duration,
        detail: String,
    },

    #[error("Rendezvous backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Rendezvous error for run '{run_id}': {message}")]
    Rendezvous { run_id: String, message: String },

    #[error("Failed to start worker local_rank={local_rank}: {message}")]
    WorkerStart {
        local_rank: u32,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A local worker exited unsuccessfully. `exit_code` is the worker's
    /// code, or `128 + signal`.
    #[error("Worker process failure: {description}")]
    WorkerProcessFailure { description: String, exit_code: i32 },

    #[error("Rendezvous round superseded: {reason}")]
    MembershipSuperseded { reason: String },

    #[error(
        "Restarts exhausted ({restarts_used} teardowns, max_restarts={max_restarts}); last failure: {last_failure}"
    )]
    RestartsExhausted {
        restarts_used: u32,
        max_restarts: u32,
        #[source]
        last_failure: Box<ElasticError>,
    },

    #[error("Worker group supervision error: {message}")]
    Supervisor {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Log directory error at '{path}': {message}")]
    LogDir {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Job aborted: {reason}")]
    Aborted { reason: String },
}

pub type Result<T> = std::result::Result<T, ElasticError>;

// Convenience constructors
impl ElasticError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn rendezvous_timeout(
        run_id: impl Into<String>,
        timeout: Duration,
        detail: impl Into<String>,
    ) -> Self {
        Self::RendezvousTimeout {
            run_id: run_id.into(),
            timeout,
            detail: detail.into(),
        }
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn backend_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn rendezvous(run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rendezvous {
            run_id: run_id.into(),
            message: message.into(),
        }
    }

    pub fn worker_start(
        local_rank: u32,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::WorkerStart {
            local_rank,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn supervisor_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Supervisor {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn log_dir(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::LogDir {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn worker_process_failure(description: impl Into<String>, exit_code: i32) -> Self {
        Self::WorkerProcessFailure {
            description: description.into(),
            exit_code,
        }
    }

    pub fn membership_superseded(reason: impl Into<String>) -> Self {
        Self::MembershipSuperseded {
            reason: reason.into(),
        }
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Returns true for errors that may go away when the call is retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// Process exit code the launcher reports for this error.
    ///
    /// Exhaustion caused by a worker failure passes the worker's own code
    /// through unchanged, so a worker exiting with 2 or 3 is indistinguishable
    /// from a rendezvous failure or exhaustion by membership changes. The
    /// log line carrying the error tells them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RestartsExhausted { last_failure, .. } => match last_failure.as_ref() {
                Self::WorkerProcessFailure { exit_code, .. } => *exit_code,
                Self::MembershipSuperseded { .. } => RESTARTS_EXHAUSTED_EXIT_CODE,
                _ => GENERIC_FAILURE_EXIT_CODE,
            },
            Self::RendezvousTimeout { .. }
            | Self::BackendUnavailable { .. }
            | Self::Rendezvous { .. } => RENDEZVOUS_FAILED_EXIT_CODE,
            _ => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}
