use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use fut_dashboard::config::{self, DashboardConfig};
use fut_dashboard::dashboard::Dashboard;
use fut_dashboard::events::StdoutSink;
use fut_dashboard::logging::{self, LogTarget};
use fut_dashboard::remote::{self, HttpBackend, Inbound, ThreadedRemote};
use fut_dashboard::{Error, Result};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Dashboard config TOML (defaults to ./fut-dashboard.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL, overrides config and FUT_DASHBOARD_URL
    #[arg(long, global = true)]
    url: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Terminal UI (live terminal, report viewer, environment editor)
    Tui,
    /// Print the cached build names, newest first as served
    Builds,
    /// Serve a build's report from cache, or regenerate it with --rebuild
    Load {
        build: String,
        /// Regenerate even when a cached report exists
        #[arg(long)]
        rebuild: bool,
    },
    /// Delete a cached build and its report
    Delete { build: String },
    /// Download a report archive
    Download {
        build: String,
        /// Target directory (defaults to download.dir from config)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the test harness environment, or change it
    Env {
        #[command(subcommand)]
        cmd: Option<EnvCommand>,
    },
    /// Print the live terminal URL
    TerminalUrl,
}

#[derive(Debug, Subcommand)]
enum EnvCommand {
    /// Submit NAME=VALUE pairs; empty or "null" values are left unchanged
    Set {
        #[arg(required = true)]
        assignments: Vec<String>,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut cfg = config::load_or_default(args.config.as_deref())?;
    if let Some(url) = args.url {
        cfg.server.base_url = url;
    }

    let target = match args.cmd {
        Command::Tui => LogTarget::File,
        _ => LogTarget::Stderr,
    };
    logging::init(&cfg.log, target)?;
    tracing::debug!(base_url = %cfg.server.base_url, "configuration loaded");

    match args.cmd {
        Command::Tui => fut_dashboard::ui::run_tui(&cfg),
        Command::Builds => cmd_builds(&cfg),
        Command::Load { build, rebuild } => cmd_load(&cfg, &build, rebuild),
        Command::Delete { build } => cmd_delete(&cfg, &build),
        Command::Download { build, out } => cmd_download(&cfg, &build, out),
        Command::Env { cmd: None } => cmd_env_get(&cfg),
        Command::Env {
            cmd: Some(EnvCommand::Set { assignments }),
        } => cmd_env_set(&cfg, &assignments),
        Command::TerminalUrl => {
            println!(
                "{}",
                remote::terminal_url(&cfg.server.base_url, cfg.terminal.port)?
            );
            Ok(())
        }
    }
}

/// Drives a [`Dashboard`] from the command line: dispatch, then pump
/// completions until the caller's condition holds.
struct Headless {
    dash: Dashboard,
    rx: mpsc::Receiver<Inbound>,
    sink: Arc<StdoutSink>,
}

impl Headless {
    fn new(cfg: &DashboardConfig) -> Result<Self> {
        let backend = HttpBackend::new(&cfg.server)?;
        let (tx, rx) = mpsc::channel();
        let remote = Arc::new(ThreadedRemote::new(backend, tx));
        let sink = Arc::new(StdoutSink::new(cfg.server.base_url.clone()));
        let dash = Dashboard::new(remote.clone(), remote, sink.clone());
        Ok(Self { dash, rx, sink })
    }

    fn run_until(&mut self, done: impl Fn(&Dashboard) -> bool) -> Result<()> {
        while !done(&self.dash) {
            let inbound = self
                .rx
                .recv()
                .map_err(|_| Error::msg("backend worker channel closed"))?;
            self.dash.handle(inbound);
        }
        let alerts = self.sink.take_alerts();
        if alerts.is_empty() {
            Ok(())
        } else {
            Err(Error::msg(alerts.join("; ")))
        }
    }
}

fn cmd_builds(cfg: &DashboardConfig) -> Result<()> {
    let mut h = Headless::new(cfg)?;
    h.dash.refresh_builds();
    h.run_until(|d| !d.builds().list_in_flight())
}

fn cmd_load(cfg: &DashboardConfig, build: &str, rebuild: bool) -> Result<()> {
    let mut h = Headless::new(cfg)?;
    h.dash.load_report(build, rebuild);
    h.run_until(|d| !d.busy())
}

fn cmd_delete(cfg: &DashboardConfig, build: &str) -> Result<()> {
    let mut h = Headless::new(cfg)?;
    h.dash.delete_report(build);
    h.run_until(|d| d.builds().deletes_in_flight().next().is_none() && !d.builds().list_in_flight())
}

fn cmd_download(cfg: &DashboardConfig, build: &str, out: Option<PathBuf>) -> Result<()> {
    let backend = HttpBackend::new(&cfg.server)?;
    let dir = out.unwrap_or_else(|| cfg.download.dir.clone());
    let path = backend.download_report(build, &dir)?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_env_get(cfg: &DashboardConfig) -> Result<()> {
    let mut h = Headless::new(cfg)?;
    h.dash.fetch_env();
    h.run_until(|d| !d.env().fetching())
}

fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| Error::msg(format!("expected NAME=VALUE, got '{raw}'")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::msg(format!("empty variable name in '{raw}'")));
    }
    Ok((name, value))
}

fn cmd_env_set(cfg: &DashboardConfig, assignments: &[String]) -> Result<()> {
    let pairs = assignments
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Vec<_>>>()?;

    let mut h = Headless::new(cfg)?;
    h.dash.fetch_env();
    h.run_until(|d| !d.env().fetching())?;

    for (name, value) in pairs {
        if !h.dash.set_env_text(name, value) {
            return Err(Error::msg(format!("unknown environment variable {name}")));
        }
    }
    if h.dash.submit_env().is_none() {
        println!("nothing to submit");
        return Ok(());
    }
    h.run_until(|d| !d.env().submitting())
}
