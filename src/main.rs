use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use metabase_dispatch::catalog::list_capabilities;
use metabase_dispatch::config::load_config;
use metabase_dispatch::dispatcher::Dispatcher;
use metabase_dispatch::errors::{ErrorCode, MetabaseResult, ValidationError};
use metabase_dispatch::{build_dispatcher, init_tracing, ResultEnvelope, ToolCall};

#[derive(Debug, Parser)]
#[command(name = "metabase-dispatch", version, about = "Dispatch tool invocations to the Metabase API")]
struct Cli {
    /// Path to config.toml. Defaults to the executable's directory, then the
    /// working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the capability catalog.
    Tools,
    /// Run a single invocation and print its envelope.
    Call {
        name: String,
        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Read one JSON tool call per stdin line and answer one JSON line each.
    Serve,
}

#[derive(Debug, Serialize)]
struct ErrorReply<'a> {
    error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
}

fn error_reply(code: ErrorCode, message: &str) -> MetabaseResult<String> {
    Ok(serde_json::to_string(&ErrorReply {
        error: ErrorBody { code, message },
    })?)
}

fn render(outcome: Result<ResultEnvelope, ValidationError>) -> MetabaseResult<String> {
    match outcome {
        Ok(envelope) => Ok(serde_json::to_string(&envelope)?),
        Err(err) => error_reply(err.code, &err.message),
    }
}

fn write_line(line: &str) -> MetabaseResult<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}

async fn serve(dispatcher: &Dispatcher) -> MetabaseResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => render(dispatcher.execute(call).await)?,
            Err(e) => {
                tracing::warn!(error = %e, "malformed tool call");
                error_reply(ErrorCode::InvalidRequest, &e.to_string())?
            }
        };
        write_line(&reply)?;
    }
    tracing::info!("stdin closed; shutting down");
    Ok(())
}

async fn run(cli: Cli) -> MetabaseResult<()> {
    if let Command::Tools = cli.command {
        return write_line(&serde_json::to_string_pretty(&list_capabilities()?)?);
    }

    let config = load_config(cli.config.as_deref())?;
    let dispatcher = build_dispatcher(&config.metabase)?;

    match cli.command {
        Command::Tools => Ok(()),
        Command::Call { name, args } => {
            let arguments = serde_json::from_str(&args)?;
            let reply = render(dispatcher.execute(ToolCall::new(name, arguments)).await)?;
            write_line(&reply)
        }
        Command::Serve => serve(&dispatcher).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "metabase-dispatch failed");
            ExitCode::FAILURE
        }
    }
}
