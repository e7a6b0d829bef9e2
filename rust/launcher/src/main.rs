//! Elastic Launcher
//!
//! Starts `nproc_per_node` copies of a training program on this node, joins
//! the rendezvous with the agents on the other nodes and keeps the worker
//! group running across failures and membership changes.
//!
//! # Usage
//!
//! ```bash
//! # Single node, four workers, in-process rendezvous
//! dtr-elastic-launch --standalone --nproc-per-node 4 train.py --epochs 10
//!
//! # Two to four nodes against a rendezvous server
//! dtr-elastic-launch --nnodes 2:4 --nproc-per-node 8 \
//!     --rdzv-backend grpc --rdzv-endpoint rdzv-host:29400 --rdzv-id job-42 \
//!     train.py
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elastic_core::agent::local_node;
use elastic_core::config::{parse_min_max_nodes, parse_rendezvous_options};
use elastic_core::{
    AgentConfig, ElasticError, LocalRendezvousBackend, RendezvousBackend, RendezvousBackendType,
    RestartController, Result, StaticRendezvousBackend, WorkerCommand,
};

/// Elastic Launcher
#[derive(Parser, Debug)]
#[command(name = "dtr-elastic-launch")]
#[command(about = "Launch an elastic worker group on this node")]
struct Args {
    /// Number of nodes, as N or MIN:MAX
    #[arg(long)]
    nnodes: Option<String>,

    /// Workers per node: a number, "cpu" or "auto"
    #[arg(long, value_parser = parse_nproc_per_node)]
    nproc_per_node: Option<u32>,

    /// Rendezvous backend (static, local, grpc)
    #[arg(long)]
    rdzv_backend: Option<String>,

    /// Rendezvous server endpoint (host:port)
    #[arg(long)]
    rdzv_endpoint: Option<String>,

    /// Run id shared by every node of the job
    #[arg(long)]
    rdzv_id: Option<String>,

    /// Extra rendezvous options (key1=v1,key2=v2)
    #[arg(long, default_value = "")]
    rdzv_conf: String,

    /// Single-node job with an in-process rendezvous and a random run id
    #[arg(long)]
    standalone: bool,

    /// Number of worker group restarts before failing
    #[arg(long)]
    max_restarts: Option<u32>,

    /// Seconds between worker status checks
    #[arg(long)]
    monitor_interval: Option<f64>,

    /// Role of the workers
    #[arg(long)]
    role: Option<String>,

    /// Base directory for worker log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Stream redirects: 0 none, 1 stdout, 2 stderr, 3 both, or rank:value,...
    #[arg(short, long)]
    redirects: Option<String>,

    /// Streams written to the log file and the console, same values as --redirects
    #[arg(short, long)]
    tee: Option<String>,

    /// Rank of this node (static backend)
    #[arg(long)]
    node_rank: Option<u32>,

    /// Address of the rank 0 node (static backend)
    #[arg(long)]
    master_addr: Option<String>,

    /// Port of the rank 0 node; 0 picks a free port
    #[arg(long)]
    master_port: Option<u16>,

    /// TOML configuration file, applied before environment and flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the program directly instead of through the Python interpreter
    #[arg(long, conflicts_with = "module")]
    no_python: bool,

    /// Treat the program as a Python module (python -m)
    #[arg(short, long)]
    module: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Program to launch
    script: String,

    /// Arguments passed to every worker
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    script_args: Vec<String>,
}

fn parse_nproc_per_node(value: &str) -> std::result::Result<u32, String> {
    match value {
        "cpu" | "auto" => Ok(std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1)),
        "gpu" => Err("gpu sizing is not supported; pass a number".to_string()),
        n => match n.parse::<u32>() {
            Ok(0) => Err("nproc-per-node must be greater than 0".to_string()),
            Ok(n) => Ok(n),
            Err(e) => Err(format!("invalid nproc-per-node '{}': {}", n, e)),
        },
    }
}

/// Build the agent configuration: file, then `DTR_*` variables, then flags.
fn build_config(args: &Args) -> Result<AgentConfig> {
    let mut config = match &args.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::default(),
    }
    .with_env_overrides();

    let rdzv = &mut config.rendezvous;
    if let Some(nnodes) = &args.nnodes {
        let (min, max) = parse_min_max_nodes(nnodes)?;
        rdzv.min_nodes = min;
        rdzv.max_nodes = max;
    }
    if let Some(backend) = &args.rdzv_backend {
        rdzv.backend = backend.parse()?;
    }
    if let Some(endpoint) = &args.rdzv_endpoint {
        rdzv.endpoint = endpoint.clone();
    }
    if let Some(run_id) = &args.rdzv_id {
        rdzv.run_id = run_id.clone();
    }
    if let Some(rank) = args.node_rank {
        rdzv.node_rank = rank;
    }
    if let Some(addr) = &args.master_addr {
        rdzv.master_addr = addr.clone();
    }
    if let Some(port) = args.master_port {
        rdzv.master_port = port;
    }
    rdzv.apply_options(&parse_rendezvous_options(&args.rdzv_conf)?)?;

    if args.standalone {
        if rdzv.max_nodes != 1 {
            tracing::warn!(
                "--standalone runs a single node; ignoring nnodes={}:{}",
                rdzv.min_nodes,
                rdzv.max_nodes
            );
        }
        rdzv.backend = RendezvousBackendType::Local;
        rdzv.run_id = uuid::Uuid::new_v4().to_string();
        rdzv.min_nodes = 1;
        rdzv.max_nodes = 1;
    }

    let worker = &mut config.worker;
    if let Some(n) = args.nproc_per_node {
        worker.local_world_size = n;
    }
    if let Some(n) = args.max_restarts {
        worker.max_restarts = n;
    }
    if let Some(secs) = args.monitor_interval {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ElasticError::config(
                "--monitor-interval must be a positive number of seconds",
            ));
        }
        worker.monitor_interval_ms = (secs * 1000.0).round().max(1.0) as u64;
    }
    if let Some(role) = &args.role {
        worker.role = role.clone();
    }

    if let Some(dir) = &args.log_dir {
        config.logging.log_dir = Some(dir.clone());
    }
    if let Some(tee) = &args.tee {
        config.logging.tee = tee.clone();
    }
    if let Some(redirects) = &args.redirects {
        config.logging.redirects = redirects.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Command every worker runs.
fn worker_command(args: &Args, local_world_size: u32) -> WorkerCommand {
    let (program, mut argv) = if args.no_python {
        (args.script.clone(), Vec::new())
    } else {
        let python = std::env::var("PYTHON_EXEC").unwrap_or_else(|_| "python".to_string());
        let mut argv = vec!["-u".to_string()];
        if args.module {
            argv.push("-m".to_string());
        }
        argv.push(args.script.clone());
        (python, argv)
    };
    argv.extend(args.script_args.iter().cloned());

    let command = WorkerCommand::new(program, argv);
    if local_world_size > 1 && std::env::var_os("OMP_NUM_THREADS").is_none() {
        tracing::warn!(
            "Setting OMP_NUM_THREADS=1 for each worker to avoid overloading the node; \
             tune it for optimal performance"
        );
        return command.with_env("OMP_NUM_THREADS", "1");
    }
    command
}

async fn create_backend(config: &AgentConfig) -> Result<Arc<dyn RendezvousBackend>> {
    let rdzv = &config.rendezvous;
    match rdzv.backend {
        RendezvousBackendType::Static => Ok(Arc::new(StaticRendezvousBackend::new(
            rdzv.node_rank,
            rdzv.max_nodes,
            rdzv.master_addr.clone(),
            rdzv.master_port,
        )?)),
        RendezvousBackendType::Local => {
            Ok(Arc::new(LocalRendezvousBackend::new(rdzv.lease_ttl())))
        }
        #[cfg(feature = "grpc")]
        RendezvousBackendType::Grpc => Ok(Arc::new(
            elastic_core::GrpcRendezvousClient::connect(rdzv).await?,
        )),
        #[cfg(not(feature = "grpc"))]
        RendezvousBackendType::Grpc => Err(ElasticError::config(
            "this launcher was built without gRPC support",
        )),
    }
}

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => "SIGINT",
            Some(()) = term.recv() => "SIGTERM",
            else => std::future::pending().await,
        },
        Err(e) => {
            tracing::warn!("failed to install SIGTERM handler: {}", e);
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

async fn launch(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let rdzv = &config.rendezvous;

    tracing::info!("Starting elastic agent");
    tracing::info!("  Run id: {}", rdzv.run_id);
    tracing::info!("  Rendezvous backend: {:?}", rdzv.backend);
    tracing::info!("  Nodes: {}:{}", rdzv.min_nodes, rdzv.max_nodes);
    tracing::info!("  Workers per node: {}", config.worker.local_world_size);
    tracing::info!("  Max restarts: {}", config.worker.max_restarts);
    if let Some(dir) = &config.logging.log_dir {
        tracing::info!("  Log directory: {}", dir.display());
    }

    let backend = create_backend(&config).await?;
    let node = local_node(&config)?;
    let command = worker_command(&args, config.worker.local_world_size);

    let (abort_tx, abort_rx) = watch::channel(false);
    let mut controller = RestartController::from_config(&config, backend, node, command, abort_rx)?;

    let run = controller.run();
    tokio::pin!(run);
    let summary = tokio::select! {
        result = &mut run => result?,
        signal = wait_for_signal() => {
            tracing::warn!("Received {}, stopping worker group", signal);
            let _ = abort_tx.send(true);
            run.await?
        }
    };

    tracing::info!(
        round = summary.round_version,
        group_rank = summary.group_rank,
        world_size = summary.world_size,
        restarts_used = summary.restarts_used,
        "Worker group finished successfully"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let code = match launch(args).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use elastic_core::rendezvous::JoinRequest;
    use std::time::Duration;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dtr-elastic-launch").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_script_args_are_passed_through() {
        let args = parse(&["--nproc-per-node", "2", "train.py", "--lr", "0.1", "-v"]);
        assert_eq!(args.nproc_per_node, Some(2));
        assert_eq!(args.script, "train.py");
        assert_eq!(args.script_args, vec!["--lr", "0.1", "-v"]);
    }

    #[test]
    fn test_nproc_per_node_values() {
        assert_eq!(parse_nproc_per_node("4"), Ok(4));
        assert!(parse_nproc_per_node("cpu").unwrap() >= 1);
        assert!(parse_nproc_per_node("auto").unwrap() >= 1);
        assert!(parse_nproc_per_node("gpu").is_err());
        assert!(parse_nproc_per_node("0").is_err());
        assert!(parse_nproc_per_node("many").is_err());
    }

    #[test]
    fn test_no_python_conflicts_with_module() {
        let result = Args::try_parse_from(["dtr-elastic-launch", "--no-python", "-m", "pkg.main"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_standalone_config() {
        let args = parse(&["--standalone", "--nnodes", "2", "--nproc-per-node", "3", "train.py"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.rendezvous.backend, RendezvousBackendType::Local);
        assert_eq!(config.rendezvous.min_nodes, 1);
        assert_eq!(config.rendezvous.max_nodes, 1);
        assert_ne!(config.rendezvous.run_id, "none");
        assert_eq!(config.worker.local_world_size, 3);
    }

    #[test]
    fn test_flags_build_elastic_config() {
        let args = parse(&[
            "--nnodes",
            "2:4",
            "--rdzv-backend",
            "grpc",
            "--rdzv-endpoint",
            "rdzv-host:29400",
            "--rdzv-id",
            "job-42",
            "--rdzv-conf",
            "join_timeout=60,last_call_timeout=5",
            "--max-restarts",
            "1",
            "--monitor-interval",
            "0.5",
            "train.py",
        ]);
        let config = build_config(&args).unwrap();
        let rdzv = &config.rendezvous;
        assert_eq!((rdzv.min_nodes, rdzv.max_nodes), (2, 4));
        assert_eq!(rdzv.backend, RendezvousBackendType::Grpc);
        assert_eq!(rdzv.endpoint, "rdzv-host:29400");
        assert_eq!(rdzv.run_id, "job-42");
        assert_eq!(rdzv.join_timeout_ms, 60_000);
        assert_eq!(rdzv.last_call_timeout_ms, 5_000);
        assert_eq!(config.worker.max_restarts, 1);
        assert_eq!(config.worker.monitor_interval_ms, 500);
    }

    #[test]
    fn test_log_stream_flags() {
        let args = parse(&["-r", "2", "-t", "0:1,1:3", "--log-dir", "/tmp/logs", "train.py"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.logging.redirects, "2");
        assert_eq!(config.logging.tee, "0:1,1:3");
        assert_eq!(config.logging.log_dir, Some(PathBuf::from("/tmp/logs")));

        let args = parse(&["--tee", "7", "train.py"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_static_backend_requires_fixed_size() {
        let args = parse(&["--nnodes", "1:2", "--rdzv-backend", "static", "train.py"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_invalid_monitor_interval() {
        let args = parse(&["--monitor-interval", "0", "train.py"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_python_command() {
        let args = parse(&["-m", "pkg.train", "--epochs", "3"]);
        let command = worker_command(&args, 1);
        assert_eq!(command.args, vec!["-u", "-m", "pkg.train", "--epochs", "3"]);
        assert!(command.env.is_empty());
    }

    #[test]
    fn test_no_python_command() {
        let args = parse(&["--no-python", "/bin/true", "x"]);
        let command = worker_command(&args, 1);
        assert_eq!(command.program, "/bin/true");
        assert_eq!(command.args, vec!["x"]);
    }

    #[tokio::test]
    async fn test_standalone_backend_is_local() {
        let args = parse(&["--standalone", "train.py"]);
        let config = build_config(&args).unwrap();
        let backend = create_backend(&config).await.unwrap();

        let node = local_node(&config).unwrap();
        let request = JoinRequest {
            run_id: config.rendezvous.run_id.clone(),
            node: node.clone(),
            min_nodes: 1,
            max_nodes: 1,
            last_call_timeout: Duration::ZERO,
        };
        let round = backend
            .join_round(&request, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(round.nodes, vec![node]);
    }
}
