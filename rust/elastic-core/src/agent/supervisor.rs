//! Local worker supervision.
//!
//! The supervisor owns the OS processes of the local worker group and is the
//! only component that signals them.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::redirects::{create_job_log_dir, worker_streams, Redirects};
use super::worker::WorkerGroup;
use crate::config::LogConfig;
use crate::error::{ElasticError, Result};

/// Details of the first worker failure observed in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub local_rank: u32,
    pub global_rank: u32,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub failed_at: DateTime<Utc>,
}

impl WorkerFailure {
    /// Exit code to report for this failure: the worker's own code, or
    /// `128 + signal` for a signalled worker.
    pub fn exit_code(&self) -> i32 {
        match (self.exit_code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

impl From<WorkerFailure> for ElasticError {
    fn from(failure: WorkerFailure) -> Self {
        ElasticError::worker_process_failure(failure.to_string(), failure.exit_code())
    }
}

impl std::fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "worker local_rank={} rank={}",
            self.local_rank, self.global_rank
        )?;
        if let Some(pid) = self.pid {
            write!(f, " pid={}", pid)?;
        }
        match (self.exit_code, self.signal) {
            (Some(code), _) => write!(f, " exited with code {}", code)?,
            (None, Some(signal)) => write!(f, " was killed by signal {}", signal)?,
            (None, None) => write!(f, " exited abnormally")?,
        }
        write!(f, " at {}", self.failed_at.to_rfc3339())
    }
}

/// Observed state of a worker group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupState {
    Running,
    /// Every worker exited with code 0. Codes are in local rank order.
    Succeeded { exit_codes: Vec<i32> },
    Failed(WorkerFailure),
}

/// Upper bound on flushing teed output once a group is stopped. A
/// grandchild holding the pipe open would otherwise block forever.
const TEE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

struct WorkerProcess {
    local_rank: u32,
    global_rank: u32,
    pid: Option<u32>,
    child: Child,
    status: Option<ExitStatus>,
    tee_tasks: Vec<JoinHandle<()>>,
}

/// Handle to a started worker group.
pub struct WorkerGroupHandle {
    workers: Vec<WorkerProcess>,
    attempt: u32,
}

impl WorkerGroupHandle {
    pub fn pids(&self) -> Vec<Option<u32>> {
        self.workers.iter().map(|w| w.pid).collect()
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

fn signal_of(status: &ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}

/// Copy a piped worker stream line by line into its log file and to the
/// agent's console, prefixing console lines with the local rank.
async fn tee_lines<R, W>(reader: R, file: std::fs::File, mut console: W, local_rank: u32)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut file = tokio::fs::File::from_std(file);
    let prefix = format!("[{}]:", local_rank);
    let mut line = Vec::new();

    let result: std::io::Result<()> = async {
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            file.write_all(&line).await?;
            let mut prefixed = Vec::with_capacity(prefix.len() + line.len());
            prefixed.extend_from_slice(prefix.as_bytes());
            prefixed.extend_from_slice(&line);
            console.write_all(&prefixed).await?;
        }
        file.flush().await?;
        console.flush().await
    }
    .await;

    if let Err(e) = result {
        tracing::debug!(local_rank, "Tee of worker output stopped: {}", e);
    }
}

/// Spawns, polls and terminates the local worker group.
#[derive(Debug, Clone, Default)]
pub struct LocalWorkerSupervisor {
    log_dir: Option<PathBuf>,
    redirects: Redirects,
    tee: Redirects,
}

impl LocalWorkerSupervisor {
    /// Supervisor writing redirected output under `log_dir` as
    /// `attempt_<n>/<local_rank>/{stdout,stderr}.log`.
    pub fn new(log_dir: Option<PathBuf>, redirects: Redirects) -> Self {
        Self {
            log_dir,
            redirects,
            tee: Redirects::default(),
        }
    }

    /// Streams to copy to the console as well as the log file.
    #[must_use]
    pub fn with_tee(mut self, tee: Redirects) -> Self {
        self.tee = tee;
        self
    }

    /// Build a supervisor for one agent of `run_id`.
    ///
    /// When any stream is redirected or teed, a fresh job log directory is
    /// created under the configured base (or the temp dir).
    pub fn from_config(config: &LogConfig, run_id: &str) -> Result<Self> {
        let redirects: Redirects = config.redirects.parse()?;
        let tee: Redirects = config.tee.parse()?;
        let log_dir = if redirects.is_none() && tee.is_none() {
            None
        } else {
            let dir = create_job_log_dir(config.log_dir.as_deref(), run_id)?;
            tracing::info!(log_dir = %dir.display(), "Writing worker logs");
            Some(dir)
        };
        Ok(Self::new(log_dir, redirects).with_tee(tee))
    }

    /// Job log directory, if any stream is redirected.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Spawn every worker of `group`.
    ///
    /// If any worker fails to start, the workers already started are killed
    /// before the error is returned.
    pub async fn start(&self, group: &WorkerGroup) -> Result<WorkerGroupHandle> {
        let mut handle = WorkerGroupHandle {
            workers: Vec::with_capacity(group.workers.len()),
            attempt: group.attempt,
        };

        for worker in &group.workers {
            let local_rank = worker.spec.local_rank;
            match self.spawn_worker(group, local_rank, &worker.env) {
                Ok((child, tee_tasks)) => {
                    let pid = child.id();
                    tracing::debug!(local_rank, global_rank = worker.spec.global_rank, ?pid, "Started worker");
                    handle.workers.push(WorkerProcess {
                        local_rank,
                        global_rank: worker.spec.global_rank,
                        pid,
                        child,
                        status: None,
                        tee_tasks,
                    });
                }
                Err(e) => {
                    tracing::error!(local_rank, "Worker failed to start, stopping the group: {}", e);
                    self.terminate(handle, Duration::ZERO).await;
                    return Err(e);
                }
            }
        }

        tracing::info!(
            run_id = %group.run_id,
            attempt = group.attempt,
            workers = handle.workers.len(),
            group_rank = group.assignment.group_rank,
            world_size = group.assignment.world_size,
            "Started worker group"
        );
        Ok(handle)
    }

    fn spawn_worker(
        &self,
        group: &WorkerGroup,
        local_rank: u32,
        env: &std::collections::BTreeMap<String, String>,
    ) -> Result<(Child, Vec<JoinHandle<()>>)> {
        let (stdout, stderr) = worker_streams(
            self.log_dir.as_deref(),
            group.attempt,
            local_rank,
            self.redirects.for_rank(local_rank),
            self.tee.for_rank(local_rank),
        )?;
        let (stdout, stdout_tee) = stdout.into_stdio();
        let (stderr, stderr_tee) = stderr.into_stdio();

        let mut child = Command::new(&group.command.program)
            .args(&group.command.args)
            .envs(env)
            .stdin(std::process::Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ElasticError::worker_start(
                    local_rank,
                    format!("failed to spawn '{}'", group.command.program),
                    e,
                )
            })?;

        let mut tee_tasks = Vec::new();
        if let (Some(file), Some(out)) = (stdout_tee, child.stdout.take()) {
            tee_tasks.push(tokio::spawn(tee_lines(out, file, tokio::io::stdout(), local_rank)));
        }
        if let (Some(file), Some(err)) = (stderr_tee, child.stderr.take()) {
            tee_tasks.push(tokio::spawn(tee_lines(err, file, tokio::io::stderr(), local_rank)));
        }
        Ok((child, tee_tasks))
    }

    /// Check the group without blocking.
    pub fn poll(&self, handle: &mut WorkerGroupHandle) -> Result<GroupState> {
        let mut failure: Option<WorkerFailure> = None;

        for worker in handle.workers.iter_mut() {
            if worker.status.is_none() {
                worker.status = worker.child.try_wait().map_err(|e| {
                    ElasticError::supervisor_with_source(
                        format!("failed to poll worker local_rank={}", worker.local_rank),
                        e,
                    )
                })?;
            }

            if let Some(status) = worker.status {
                if !status.success() && failure.is_none() {
                    failure = Some(WorkerFailure {
                        local_rank: worker.local_rank,
                        global_rank: worker.global_rank,
                        pid: worker.pid,
                        exit_code: status.code(),
                        signal: signal_of(&status),
                        failed_at: Utc::now(),
                    });
                }
            }
        }

        if let Some(failure) = failure {
            return Ok(GroupState::Failed(failure));
        }

        let exit_codes: Option<Vec<i32>> = handle
            .workers
            .iter()
            .map(|w| w.status.and_then(|s| s.code()))
            .collect();
        Ok(match exit_codes {
            Some(exit_codes) => GroupState::Succeeded { exit_codes },
            None => GroupState::Running,
        })
    }

    /// Stop every worker still running and wait for all of them to exit.
    ///
    /// Workers get SIGTERM and `grace` to exit before they are killed.
    /// Teed output is flushed before this returns.
    pub async fn terminate(&self, mut handle: WorkerGroupHandle, grace: Duration) {
        self.stop_workers(&mut handle, grace).await;

        let mut tee_tasks: Vec<JoinHandle<()>> = handle
            .workers
            .iter_mut()
            .flat_map(|w| w.tee_tasks.drain(..))
            .collect();
        if tee_tasks.is_empty() {
            return;
        }
        if tokio::time::timeout(TEE_DRAIN_TIMEOUT, join_all(tee_tasks.iter_mut()))
            .await
            .is_err()
        {
            tracing::warn!(attempt = handle.attempt, "Worker output still open, abandoning tee");
            for task in &tee_tasks {
                task.abort();
            }
        }
    }

    async fn stop_workers(&self, handle: &mut WorkerGroupHandle, grace: Duration) {
        let running: Vec<&mut WorkerProcess> = handle
            .workers
            .iter_mut()
            .filter(|w| w.status.is_none())
            .collect();
        if running.is_empty() {
            return;
        }

        if !grace.is_zero() {
            for worker in &running {
                if let Some(pid) = worker.pid {
                    send_sigterm(pid);
                }
            }
        }

        let waits = join_all(running.into_iter().map(|w| async move {
            let status = tokio::time::timeout(grace, w.child.wait()).await;
            if !matches!(status, Ok(Ok(_))) {
                if let Err(e) = w.child.start_kill() {
                    tracing::debug!(local_rank = w.local_rank, "kill failed: {}", e);
                }
                if let Err(e) = w.child.wait().await {
                    tracing::warn!(local_rank = w.local_rank, "Failed to reap worker: {}", e);
                }
                tracing::warn!(local_rank = w.local_rank, "Worker killed after grace period");
            }
        }));
        waits.await;

        tracing::info!(attempt = handle.attempt, "Worker group stopped");
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    // SAFETY: kill has no memory safety preconditions
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret != 0 {
        tracing::debug!(pid, "SIGTERM failed: {}", std::io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::agent::ranks::assign_ranks;
    use crate::agent::redirects::Std;
    use crate::agent::worker::WorkerCommand;
    use crate::rendezvous::NodeInfo;
    use tempfile::TempDir;

    fn group(script: &str, local_world_size: u32) -> WorkerGroup {
        let nodes = vec![NodeInfo::new("a", "127.0.0.1", "trainer", 29500)];
        let assignment = assign_ranks(&nodes, 0, local_world_size).unwrap();
        let command = WorkerCommand::new("/bin/sh", vec!["-c".to_string(), script.to_string()]);
        WorkerGroup::new("job", 1, 0, 3, 0, command, assignment)
    }

    async fn wait_until_done(
        supervisor: &LocalWorkerSupervisor,
        handle: &mut WorkerGroupHandle,
    ) -> GroupState {
        for _ in 0..500 {
            let state = supervisor.poll(handle).unwrap();
            if state != GroupState::Running {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("worker group did not finish");
    }

    #[tokio::test]
    async fn test_all_workers_succeed() {
        let supervisor = LocalWorkerSupervisor::default();
        let mut handle = supervisor.start(&group("exit 0", 3)).await.unwrap();
        assert_eq!(handle.len(), 3);

        let state = wait_until_done(&supervisor, &mut handle).await;
        assert_eq!(state, GroupState::Succeeded { exit_codes: vec![0, 0, 0] });
    }

    #[tokio::test]
    async fn test_failure_names_worker() {
        let supervisor = LocalWorkerSupervisor::default();
        let mut handle = supervisor
            .start(&group(r#"[ "$LOCAL_RANK" = "1" ] && exit 7; sleep 5"#, 2))
            .await
            .unwrap();

        let state = wait_until_done(&supervisor, &mut handle).await;
        match state {
            GroupState::Failed(failure) => {
                assert_eq!(failure.local_rank, 1);
                assert_eq!(failure.global_rank, 1);
                assert_eq!(failure.exit_code, Some(7));
                assert_eq!(failure.exit_code(), 7);
                assert!(failure.to_string().contains("exited with code 7"));
            }
            other => panic!("unexpected state {:?}", other),
        }

        supervisor.terminate(handle, Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_terminate_stops_running_workers() {
        let supervisor = LocalWorkerSupervisor::default();
        let handle = supervisor.start(&group("sleep 30", 2)).await.unwrap();
        let pids: Vec<u32> = handle.pids().into_iter().flatten().collect();
        assert_eq!(pids.len(), 2);

        let started = std::time::Instant::now();
        supervisor.terminate(handle, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(5));

        for pid in pids {
            // SAFETY: signal 0 only checks for existence
            let alive = unsafe { libc::kill(pid as libc::pid_t, 0) } == 0;
            assert!(!alive, "pid {} still running", pid);
        }
    }

    #[tokio::test]
    async fn test_terminate_kills_after_grace() {
        let supervisor = LocalWorkerSupervisor::default();
        let handle = supervisor
            .start(&group("trap '' TERM; sleep 30", 1))
            .await
            .unwrap();
        // Give the shell time to install the trap.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        supervisor
            .terminate(handle, Duration::from_millis(200))
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_signalled_worker_exit_code() {
        let supervisor = LocalWorkerSupervisor::default();
        let mut handle = supervisor.start(&group("kill -9 $$", 1)).await.unwrap();

        match wait_until_done(&supervisor, &mut handle).await {
            GroupState::Failed(failure) => {
                assert_eq!(failure.signal, Some(9));
                assert_eq!(failure.exit_code(), 137);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_environment_is_injected() {
        let dir = TempDir::new().unwrap();
        let supervisor =
            LocalWorkerSupervisor::new(Some(dir.path().to_path_buf()), Redirects::Uniform(Std::All));
        let mut handle = supervisor
            .start(&group(r#"echo "$RANK/$WORLD_SIZE $MASTER_ADDR""#, 2))
            .await
            .unwrap();
        wait_until_done(&supervisor, &mut handle).await;

        let out = std::fs::read_to_string(dir.path().join("attempt_0/1/stdout.log")).unwrap();
        assert_eq!(out.trim(), "1/2 127.0.0.1");
    }

    #[tokio::test]
    async fn test_tee_writes_log_file() {
        let dir = TempDir::new().unwrap();
        let supervisor = LocalWorkerSupervisor::new(Some(dir.path().to_path_buf()), Redirects::default())
            .with_tee(Redirects::Uniform(Std::Out));
        let mut handle = supervisor
            .start(&group("echo hello; echo world; echo oops >&2", 1))
            .await
            .unwrap();
        assert_eq!(
            wait_until_done(&supervisor, &mut handle).await,
            GroupState::Succeeded { exit_codes: vec![0] }
        );
        supervisor.terminate(handle, Duration::from_secs(1)).await;

        let worker_dir = dir.path().join("attempt_0/0");
        let out = std::fs::read_to_string(worker_dir.join("stdout.log")).unwrap();
        assert_eq!(out, "hello\nworld\n");
        assert!(!worker_dir.join("stderr.log").exists());
    }

    #[tokio::test]
    async fn test_tee_and_redirect_per_stream() {
        let dir = TempDir::new().unwrap();
        let supervisor =
            LocalWorkerSupervisor::new(Some(dir.path().to_path_buf()), Redirects::Uniform(Std::Err))
                .with_tee(Redirects::Uniform(Std::Out));
        let mut handle = supervisor
            .start(&group("echo out; echo err >&2", 1))
            .await
            .unwrap();
        wait_until_done(&supervisor, &mut handle).await;
        supervisor.terminate(handle, Duration::from_secs(1)).await;

        let worker_dir = dir.path().join("attempt_0/0");
        assert_eq!(std::fs::read_to_string(worker_dir.join("stdout.log")).unwrap(), "out\n");
        assert_eq!(std::fs::read_to_string(worker_dir.join("stderr.log")).unwrap(), "err\n");
    }

    #[tokio::test]
    async fn test_agents_sharing_log_dir_do_not_collide() {
        let base = TempDir::new().unwrap();
        let config = LogConfig {
            log_dir: Some(base.path().to_path_buf()),
            redirects: "1".to_string(),
            tee: "0".to_string(),
        };
        let a = LocalWorkerSupervisor::from_config(&config, "job").unwrap();
        let b = LocalWorkerSupervisor::from_config(&config, "job").unwrap();
        let (a_dir, b_dir) = (a.log_dir().unwrap(), b.log_dir().unwrap());
        assert_ne!(a_dir, b_dir);

        for (supervisor, name) in [(&a, "a"), (&b, "b")] {
            let mut handle = supervisor
                .start(&group(&format!("echo {}", name), 1))
                .await
                .unwrap();
            wait_until_done(supervisor, &mut handle).await;
        }
        let read = |dir: &Path| std::fs::read_to_string(dir.join("attempt_0/0/stdout.log")).unwrap();
        assert_eq!(read(a_dir), "a\n");
        assert_eq!(read(b_dir), "b\n");
    }

    #[test]
    fn test_no_log_dir_without_redirects() {
        let config = LogConfig {
            log_dir: Some(PathBuf::from("/nonexistent/logs")),
            ..Default::default()
        };
        let supervisor = LocalWorkerSupervisor::from_config(&config, "job").unwrap();
        assert!(supervisor.log_dir().is_none());
    }

    #[test]
    fn test_redirects_without_log_dir_use_temp_dir() {
        let config = LogConfig {
            tee: "3".to_string(),
            ..Default::default()
        };
        let supervisor = LocalWorkerSupervisor::from_config(&config, "job").unwrap();
        let dir = supervisor.log_dir().unwrap().to_path_buf();
        assert!(dir.starts_with(std::env::temp_dir()));
        assert!(dir.is_dir());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let nodes = vec![NodeInfo::new("a", "127.0.0.1", "trainer", 29500)];
        let assignment = assign_ranks(&nodes, 0, 2).unwrap();
        let command = WorkerCommand::new("/nonexistent/worker-binary", vec![]);
        let group = WorkerGroup::new("job", 1, 0, 3, 0, command, assignment);

        let err = LocalWorkerSupervisor::default()
            .start(&group)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ElasticError::WorkerStart { local_rank: 0, .. }));
    }
}
