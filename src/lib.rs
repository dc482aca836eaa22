pub mod app;

use std::path::Path;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use app::commands::{
    browse_logs, check_adb, get_config, kill_apps, list_services, pull_logs, reset_config,
    resolve_trace_id, CommandContext,
};
use app::config::{config_path, load_config, AppConfig};
use app::error::AppError;
use app::logging::init_logging;
use app::models::{CommandResponse, KillRequest, PullRequest};
use app::selection::ServiceChoice;
use app::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "log_puller", version, about = "Pull and triage device diagnostic logs over adb")]
pub struct Cli {
    /// Device serial, passed to adb as `-s`.
    #[arg(long, global = true)]
    pub serial: Option<String>,

    /// Path to the adb executable.
    #[arg(long, global = true)]
    pub adb: Option<String>,

    /// Print the final result as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Reuse a trace id from a caller instead of generating one.
    #[arg(long, global = true)]
    pub trace_id: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Args)]
pub struct ServiceArgs {
    /// `all`, `none`, or one service prefix.
    #[arg(long, default_value = "all")]
    pub service: String,

    /// Several service prefixes; overrides `--service`.
    #[arg(long = "services", value_delimiter = ',')]
    pub services: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Pull recent logs into a new timestamped folder.
    Pull {
        #[command(flatten)]
        choice: ServiceArgs,
        /// Breadth of the selection; defaults to `selection.default_count`.
        #[arg(long)]
        count: Option<i64>,
        /// Pull these log names as-is instead of selecting.
        #[arg(long = "file")]
        files: Vec<String>,
        #[arg(long)]
        logcat: bool,
        #[arg(long)]
        kernel: bool,
        #[arg(long)]
        anr: bool,
    },
    /// List pdlog files on the device for the chosen services.
    Browse {
        #[command(flatten)]
        choice: ServiceArgs,
    },
    /// Force-stop the configured packages.
    Kill {
        /// Delete `*pdlog*` files in the log directory first.
        #[arg(long)]
        delete_pdlog: bool,
    },
    /// Print the known service prefixes.
    Services,
    /// Check that adb can be invoked.
    CheckAdb,
    /// Show or reset the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    Show,
    Reset,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let trace_id = resolve_trace_id(cli.trace_id.clone());

    let (config, load_error) = match load_config(&trace_id) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    init_logging(&config.logging);
    if let Some(err) = load_error {
        warn!(trace_id = %trace_id, path = %config_path().display(), error = %err.error, "using default config");
    }

    let state = AppState::with_lock_dir(Path::new(&config.output.local_root));
    let ctx = CommandContext {
        config,
        trace_id,
        adb_override: cli.adb.clone(),
        serial_override: cli.serial.clone(),
    };
    dispatch(&cli, &ctx, &state)
}

fn dispatch(cli: &Cli, ctx: &CommandContext, state: &AppState) -> ExitCode {
    let json = cli.json;
    let print_progress = |line: &str| {
        if !json {
            println!("{line}");
        }
    };

    match &cli.command {
        CliCommand::Pull {
            choice,
            count,
            files,
            logcat,
            kernel,
            anr,
        } => {
            let choice = ServiceChoice::parse(&choice.service, &choice.services);
            let request = PullRequest {
                services: ctx.selector().resolve_services(&choice),
                count: count.unwrap_or(ctx.config.selection.default_count),
                need_logcat: *logcat,
                need_kernel: *kernel,
                need_anr: *anr,
                selected_files: files.clone(),
            };
            finish(
                json,
                pull_logs(state, ctx, request, print_progress),
                |outcome| format!("Done. Output: {}", outcome.target_dir),
            )
        }
        CliCommand::Browse { choice } => {
            let choice = ServiceChoice::parse(&choice.service, &choice.services);
            finish(json, browse_logs(ctx, &choice), |listing| {
                let mut text = listing.files.join("\n");
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&format!("Listed {} logs.", listing.files.len()));
                text
            })
        }
        CliCommand::Kill { delete_pdlog } => {
            let request = KillRequest {
                packages: ctx.config.kill.packages.clone(),
                delete_pdlog_first: *delete_pdlog,
            };
            finish(
                json,
                kill_apps(state, ctx, request, print_progress),
                |report| {
                    format!(
                        "Kill done: {} packages, {} failed",
                        report.attempted.len(),
                        report.failed.len()
                    )
                },
            )
        }
        CliCommand::Services => finish(json, Ok(list_services(ctx)), |services| services.join("\n")),
        CliCommand::CheckAdb => {
            let response = check_adb(ctx);
            let available = response.data.available;
            let code = finish(json, Ok(response), |info| match &info.error {
                None => format!("{}\n{}", info.command_path, info.version_output),
                Some(error) => format!("adb unavailable ({}): {error}", info.command_path),
            });
            if available {
                code
            } else {
                ExitCode::FAILURE
            }
        }
        CliCommand::Config { action } => match action {
            ConfigAction::Show => finish(true, Ok(get_config(ctx)), |_| String::new()),
            ConfigAction::Reset => finish(json, reset_config(ctx), |_| {
                format!("Config reset: {}", config_path().display())
            }),
        },
    }
}

fn finish<T: Serialize>(
    json: bool,
    result: Result<CommandResponse<T>, AppError>,
    summary: impl FnOnce(&T) -> String,
) -> ExitCode {
    match result {
        Ok(response) => {
            if json {
                print_json(&response);
            } else {
                println!("{}", summary(&response.data));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            if json {
                print_json(&err);
            } else {
                eprintln!("Failed: {} [trace_id={}]", err, err.trace_id);
            }
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => println!("{payload}"),
        Err(err) => eprintln!("Failed to serialize output: {err}"),
    }
}
