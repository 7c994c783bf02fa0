// Oxygen - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Workspace folder creation
// 4. Dispatch to the execute / status / tail / autoexec / paths commands

use clap::{Parser, Subcommand};
use oxygen::app::autoexec::AutoExec;
use oxygen::app::dispatcher::Dispatcher;
use oxygen::app::tail::{LogWatchConfig, LogWatcher};
use oxygen::core::model::LogWatchEvent;
use oxygen::platform::config::{load_config, AppConfig, PlatformPaths};
use oxygen::ui::{console, theme};
use oxygen::util::error::{LogWatchError, OxygenError};
use oxygen::util::{constants, logging};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Oxygen - script delivery to local game executors and live client log
/// tailing.
#[derive(Parser, Debug)]
#[command(name = "oxygen", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Path to config.toml (defaults to the platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deliver a script file (or `-` for stdin) to the selected executor.
    Execute {
        file: PathBuf,
        /// Executor name or letter (A/B/C). Defaults to the configured one.
        #[arg(short = 'e', long = "executor")]
        executor: Option<String>,
        /// Skip discovery and use this port (Hydrogen always uses its fixed port).
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Probe the executor's ports.
    Status {
        #[arg(short = 'e', long = "executor")]
        executor: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Follow the newest client log file.
    Tail {
        /// Log directory override.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Manage the auto-execute folder.
    #[command(subcommand)]
    Autoexec(AutoExecCommand),
    /// Print the resolved platform paths.
    Paths,
}

#[derive(Subcommand, Debug)]
enum AutoExecCommand {
    List,
    /// Copy a script file into the folder under `name`.
    Add { name: String, file: PathBuf },
    Remove { name: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = PlatformPaths::resolve();
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let (config, config_warnings) = load_config(&config_path);

    logging::init(
        cli.debug,
        config.log_level.as_deref(),
        config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "Oxygen starting"
    );
    for warning in &config_warnings {
        tracing::warn!("{warning}");
        eprintln!("Warning: {warning}");
    }

    if let Err(e) = paths.ensure_workspace() {
        tracing::warn!(error = %e, "Could not create workspace folders");
    }

    match run(cli.command, &config, &paths) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &AppConfig, paths: &PlatformPaths) -> Result<ExitCode, OxygenError> {
    match command {
        Command::Execute {
            file,
            executor,
            port,
            json,
        } => {
            let dispatcher = dispatcher_for(config, executor.as_deref())?;
            let script = read_script(&file)?;
            let result = dispatcher.execute(&script, port);

            if json {
                println!("{}", to_json(&result));
            } else if result.success {
                println!(
                    "Delivered to {} on port {}",
                    result.kind,
                    result.port.unwrap_or_default()
                );
            } else if let Some(err) = &result.error {
                eprintln!("{err}");
            }

            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Status { executor, json } => {
            let dispatcher = dispatcher_for(config, executor.as_deref())?;
            let kind = dispatcher.executor_kind();
            let probes = dispatcher.port_statuses(Some(kind));

            if json {
                println!("{}", to_json(&probes));
            } else {
                let colour = std::io::stdout().is_terminal();
                println!("{kind} ({})", dispatcher.driver(kind).ports());
                for probe in &probes {
                    let label = if probe.status.is_online() { "online" } else { "offline" };
                    let cell = format!("{:>5}  {label}", probe.port);
                    if colour {
                        println!("{}", theme::paint(theme::status_level(probe.status.is_online()), &cell));
                    } else {
                        println!("{cell}");
                    }
                }
            }

            let any_online = probes.iter().any(|p| p.status.is_online());
            Ok(if any_online {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Tail { dir } => {
            let directory = dir
                .or_else(|| config.log_dir.clone())
                .unwrap_or_else(|| paths.log_dir.clone());
            tail(LogWatchConfig {
                directory,
                patterns: config.log_patterns.clone(),
                rescan_interval_ms: config.rescan_interval_ms,
            })
        }

        Command::Autoexec(sub) => {
            let auto = AutoExec::new(paths.autoexec_dir.clone());
            match sub {
                AutoExecCommand::List => {
                    for script in auto.list()? {
                        println!("{}", script.name);
                    }
                }
                AutoExecCommand::Add { name, file } => {
                    let content = std::fs::read_to_string(&file).map_err(|source| OxygenError::Io {
                        path: file.clone(),
                        operation: "read script",
                        source,
                    })?;
                    let path = auto.add(&name, &content)?;
                    println!("Added {}", path.display());
                }
                AutoExecCommand::Remove { name } => {
                    if auto.remove(&name)? {
                        println!("Removed {name}");
                    } else {
                        println!("{name} is not in the auto-execute folder");
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Paths => {
            println!("config     {}", paths.config_file().display());
            println!("data       {}", paths.data_dir.display());
            println!("workspace  {}", paths.workspace_dir.display());
            println!("scripts    {}", paths.scripts_dir.display());
            println!("autoexec   {}", paths.autoexec_dir.display());
            println!(
                "logs       {}",
                config.log_dir.as_deref().unwrap_or(&paths.log_dir).display()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Dispatcher on the configured host, with `--executor` overriding the
/// configured default.
fn dispatcher_for(config: &AppConfig, executor: Option<&str>) -> Result<Dispatcher, OxygenError> {
    let dispatcher = Dispatcher::new(config.executor, config.host);
    if let Some(name) = executor {
        dispatcher.set_executor_kind(name)?;
    }
    Ok(dispatcher)
}

fn read_script(file: &Path) -> Result<Vec<u8>, OxygenError> {
    let io_err = |source: std::io::Error| OxygenError::Io {
        path: file.to_path_buf(),
        operation: "read script",
        source,
    };
    if file.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf).map_err(io_err)?;
        Ok(buf)
    } else {
        std::fs::read(file).map_err(io_err)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

/// Print classified lines until the process is interrupted. While no log
/// file exists the start is retried every rescan interval.
fn tail(config: LogWatchConfig) -> Result<ExitCode, OxygenError> {
    let retry = Duration::from_millis(config.rescan_interval_ms);
    let colour = std::io::stdout().is_terminal();
    let mut watcher = LogWatcher::new(config.clone());

    loop {
        match watcher.start() {
            Ok(_) => {}
            Err(LogWatchError::NoLogFound { directory }) => {
                tracing::info!(dir = %directory.display(), "No log file yet, waiting");
                std::thread::sleep(retry);
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        while let Some(event) = next_event(&watcher) {
            match event {
                LogWatchEvent::Switched { path } => {
                    eprintln!("==> {} <==", path.display());
                }
                LogWatchEvent::Line(line) => {
                    println!("{}", console::format_line(&line, chrono::Local::now(), colour));
                }
                LogWatchEvent::Stopped => break,
            }
        }

        // The watch thread exited on its own; start over.
        watcher.stop();
    }
}

fn next_event(watcher: &LogWatcher) -> Option<LogWatchEvent> {
    loop {
        if let Some(event) = watcher.recv_event(Duration::from_millis(500)) {
            return Some(event);
        }
        if !watcher.is_active() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxygen::core::model::ExecutorKind;

    #[test]
    fn test_cli_parses_execute() {
        let cli = Cli::try_parse_from(["oxygen", "execute", "s.lua", "-e", "B", "--port", "8393", "--json"]).unwrap();
        match cli.command {
            Command::Execute {
                file,
                executor,
                port,
                json,
            } => {
                assert_eq!(file, PathBuf::from("s.lua"));
                assert_eq!(executor.as_deref(), Some("B"));
                assert_eq!(port, Some(8393));
                assert!(json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_debug_after_subcommand() {
        let cli = Cli::try_parse_from(["oxygen", "paths", "--debug"]).unwrap();
        assert!(cli.debug);
    }

    #[test]
    fn test_unknown_executor_is_error() {
        let config = AppConfig::default();
        assert!(dispatcher_for(&config, Some("nope")).is_err());
        let d = dispatcher_for(&config, Some("hydrogen")).unwrap();
        assert_eq!(d.executor_kind(), ExecutorKind::Hydrogen);
    }
}
