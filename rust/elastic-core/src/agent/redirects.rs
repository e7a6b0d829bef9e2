//! Worker output redirection.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use crate::error::{ElasticError, Result};

/// Which standard streams of a worker go to files (or are teed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Std {
    #[default]
    None,
    Out,
    Err,
    All,
}

impl Std {
    pub fn redirects_stdout(self) -> bool {
        matches!(self, Self::Out | Self::All)
    }

    pub fn redirects_stderr(self) -> bool {
        matches!(self, Self::Err | Self::All)
    }
}

impl TryFrom<u8> for Std {
    type Error = ElasticError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Out),
            2 => Ok(Self::Err),
            3 => Ok(Self::All),
            other => Err(ElasticError::config(format!(
                "invalid redirect value {} (expected 0, 1, 2 or 3)",
                other
            ))),
        }
    }
}

fn parse_std(value: &str) -> Result<Std> {
    let n: u8 = value.trim().parse().map_err(|e| {
        ElasticError::config_with_source(format!("invalid redirect value '{}'", value), e)
    })?;
    Std::try_from(n)
}

/// Redirect setting for every local rank.
///
/// Parsed from either a single value applied to all ranks (`"3"`) or a
/// per-rank mapping (`"0:1,1:2"`); ranks absent from a mapping are not
/// redirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirects {
    Uniform(Std),
    PerRank(HashMap<u32, Std>),
}

impl Default for Redirects {
    fn default() -> Self {
        Self::Uniform(Std::None)
    }
}

impl Redirects {
    pub fn for_rank(&self, local_rank: u32) -> Std {
        match self {
            Self::Uniform(std) => *std,
            Self::PerRank(map) => map.get(&local_rank).copied().unwrap_or_default(),
        }
    }

    /// True when no rank has any stream selected.
    pub fn is_none(&self) -> bool {
        match self {
            Self::Uniform(std) => *std == Std::None,
            Self::PerRank(map) => map.values().all(|std| *std == Std::None),
        }
    }
}

impl FromStr for Redirects {
    type Err = ElasticError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        if !s.contains(':') {
            return parse_std(s).map(Self::Uniform);
        }

        let mut map = HashMap::new();
        for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let (rank, value) = item.split_once(':').ok_or_else(|| {
                ElasticError::config(format!("redirect entry '{}' is not in rank:value form", item))
            })?;
            let rank: u32 = rank.trim().parse().map_err(|e| {
                ElasticError::config_with_source(format!("invalid local rank in '{}'", item), e)
            })?;
            map.insert(rank, parse_std(value)?);
        }
        Ok(Self::PerRank(map))
    }
}

/// Create the log directory of one agent: `<base>/<run_id>_<suffix>`.
///
/// The random suffix keeps agents of the same run that share `base` apart.
/// Without a base, a directory under the system temp dir is used.
pub fn create_job_log_dir(base: Option<&Path>, run_id: &str) -> Result<PathBuf> {
    let base = match base {
        Some(base) => base.to_path_buf(),
        None => std::env::temp_dir().join("dtr_elastic"),
    };
    let run_id: String = run_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let dir = base.join(format!("{}_{}", run_id, &suffix[..8]));

    std::fs::create_dir_all(&dir)
        .map_err(|e| ElasticError::log_dir(&dir, "failed to create job log directory", e))?;
    Ok(dir)
}

// `<log_dir>/attempt_<attempt>/<local_rank>`
fn worker_log_dir(log_dir: &Path, attempt: u32, local_rank: u32) -> PathBuf {
    log_dir
        .join(format!("attempt_{}", attempt))
        .join(local_rank.to_string())
}

/// Destination of one standard stream of a worker.
#[derive(Debug)]
pub enum StreamTarget {
    Inherit,
    File(File),
    /// Written to the file and copied to the agent's console.
    Tee(File),
}

impl StreamTarget {
    /// The child's side of the stream, and the file the agent must copy
    /// the piped output into when teeing.
    pub fn into_stdio(self) -> (Stdio, Option<File>) {
        match self {
            Self::Inherit => (Stdio::inherit(), None),
            Self::File(file) => (Stdio::from(file), None),
            Self::Tee(file) => (Stdio::piped(), Some(file)),
        }
    }
}

/// Open the stdout and stderr targets of a worker.
///
/// Teeing a stream takes precedence over redirecting it. Without a log
/// directory, or for streams that are neither, the worker inherits the
/// agent's stream.
pub fn worker_streams(
    log_dir: Option<&Path>,
    attempt: u32,
    local_rank: u32,
    redirect: Std,
    tee: Std,
) -> Result<(StreamTarget, StreamTarget)> {
    let Some(log_dir) = log_dir else {
        return Ok((StreamTarget::Inherit, StreamTarget::Inherit));
    };
    if redirect == Std::None && tee == Std::None {
        return Ok((StreamTarget::Inherit, StreamTarget::Inherit));
    }

    let dir = worker_log_dir(log_dir, attempt, local_rank);
    std::fs::create_dir_all(&dir)
        .map_err(|e| ElasticError::log_dir(&dir, "failed to create worker log directory", e))?;

    let open = |name: &str| -> Result<File> {
        let path = dir.join(name);
        File::create(&path)
            .map_err(|e| ElasticError::log_dir(&path, "failed to create worker log file", e))
    };

    let stdout = if tee.redirects_stdout() {
        StreamTarget::Tee(open("stdout.log")?)
    } else if redirect.redirects_stdout() {
        StreamTarget::File(open("stdout.log")?)
    } else {
        StreamTarget::Inherit
    };
    let stderr = if tee.redirects_stderr() {
        StreamTarget::Tee(open("stderr.log")?)
    } else if redirect.redirects_stderr() {
        StreamTarget::File(open("stderr.log")?)
    } else {
        StreamTarget::Inherit
    };
    Ok((stdout, stderr))
}
