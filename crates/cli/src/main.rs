//! Tether host process
//!
//! Runs a user automation script against the native bridge: parses the
//! `--key=value` invocation convention, wires the platform capabilities
//! into the script host, streams script output, and exits non-zero when
//! the script fails.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use tether_platform::{DesktopActions, NativeActions};
use tether_protocol::{ActionBinding, ActionUri, InvocationArgs, RunId};
use tether_script_host::{
    Bridge, HostRequest, HostResponse, ScriptConfig, ScriptEvent, ScriptHost,
};

#[derive(Parser)]
#[command(name = "tether", version, about = "Run automation scripts against the native bridge")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script with `--key=value` invocation arguments
    Run {
        /// Path to the script file
        script: PathBuf,

        /// Script timeout in milliseconds
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,

        /// Invocation parameters: `--key=value` pairs, plus an optional
        /// reserved `--action="Label|URI"` binding
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// Re-run a script from an externally triggered action URI
    Trigger {
        /// Path to the script file
        script: PathBuf,

        /// Action URI, e.g. `chanify://action/run-script/test?name=test`
        uri: String,

        /// Script timeout in milliseconds
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "script run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (script, args, binding, timeout_ms) = match cli.command {
        Command::Run {
            script,
            timeout_ms,
            params,
        } => {
            let (args, binding) = InvocationArgs::parse(&params)?;
            (script, args, binding, timeout_ms)
        }
        Command::Trigger {
            script,
            uri,
            timeout_ms,
        } => {
            let uri = ActionUri::parse(&uri)?;
            (script, uri.invocation_args(), None, timeout_ms)
        }
    };

    if let Some(binding) = &binding {
        register_action(binding);
    }

    let source = std::fs::read_to_string(&script)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_script(&source, args, timeout_ms))
}

/// Registering the URI with the OS is the installer's job; the binding is
/// parsed and surfaced here so a bad one fails before the script runs.
fn register_action(binding: &ActionBinding) {
    tracing::info!(label = %binding.label, uri = %binding.uri, "action binding registered");
}

async fn run_script(
    source: &str,
    args: InvocationArgs,
    timeout_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = ScriptHost::new(ScriptConfig {
        timeout_ms,
        ..ScriptConfig::default()
    });
    let bridge = Bridge::new(args);
    let actions: Arc<dyn NativeActions> = Arc::new(DesktopActions::new());

    let (events_tx, mut events_rx) = mpsc::channel(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let ScriptEvent::Output { text, .. } = event {
                println!("{text}");
            }
        }
    });

    let run_id = RunId::new();
    tracing::debug!(%run_id, "starting script run");
    let result = host
        .execute(
            run_id,
            source,
            bridge,
            move |request| match request {
                HostRequest::PresentAlert { request } => {
                    match actions.present_alert(&request) {
                        Ok(ticket) => HostResponse::AlertPending(ticket),
                        Err(error) => HostResponse::Error(error),
                    }
                }
                HostRequest::RouteTo { url } => match actions.dispatch_url(&url) {
                    Ok(()) => HostResponse::Ok,
                    Err(error) => HostResponse::Error(error),
                },
            },
            events_tx,
        )
        .await;

    let _ = printer.await;

    let result = result?;
    if let Some(value) = result.return_value {
        tracing::debug!(%value, "script returned");
    }
    Ok(())
}
