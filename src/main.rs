use std::path::PathBuf;
use std::process;

use apicheck::cmd::{CommandResponse, r#assert, extract, resolve};
use apicheck::config::{self, KernelConfig};
use apicheck::logging;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Parser)]
#[command(
    name = "apicheck",
    version,
    about = "Resolve dependencies, assert and extract API response values"
)]
struct Cli {
    /// TOML file with cache, resolution and logging settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run an assertion group against a response.
    Assert(AssertArgs),
    /// Extract named values from a response.
    Extract(ExtractArgs),
    /// Resolve dependencies and print their values.
    Resolve(ResolveArgs),
}

#[derive(Debug, clap::Args)]
struct AssertArgs {
    #[arg(long)]
    group: PathBuf,

    #[arg(long)]
    response: PathBuf,

    #[arg(long)]
    deps: Option<PathBuf>,

    #[command(flatten)]
    stores: StoreArgs,
}

#[derive(Debug, clap::Args)]
struct ExtractArgs {
    #[arg(long)]
    extractors: PathBuf,

    #[arg(long)]
    response: PathBuf,
}

#[derive(Debug, clap::Args)]
struct ResolveArgs {
    #[arg(long)]
    deps: PathBuf,

    #[command(flatten)]
    stores: StoreArgs,
}

#[derive(Debug, clap::Args)]
struct StoreArgs {
    /// Recorded step outputs: `{scene_id: {step_id: output}}`.
    #[arg(long)]
    scenes: Option<PathBuf>,

    /// Key-value entries: `{key: {type, value}}`.
    #[arg(long)]
    kv: Option<PathBuf>,
}

#[derive(Serialize)]
struct CliError<'a> {
    error: &'a str,
    message: String,
    code: i32,
    details: Value,
}

#[tokio::main]
async fn main() {
    process::exit(run().await);
}

async fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return handle_parse_error(error),
    };

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            emit_error(
                "input_usage_error",
                error.to_string(),
                json!({"kind": "config_error"}),
                3,
            );
            return 3;
        }
    };
    logging::init(&config.log.filter);

    let (command, response) = dispatch(cli.command, &config).await;
    emit_response(command, response)
}

async fn dispatch(command: Commands, config: &KernelConfig) -> (&'static str, CommandResponse) {
    match command {
        Commands::Assert(args) => {
            let args = r#assert::AssertCommandArgs {
                group: args.group,
                response: args.response,
                deps: args.deps,
                scenes: args.stores.scenes,
                kv: args.stores.kv,
            };
            ("assert", r#assert::run(&args, config).await)
        }
        Commands::Extract(args) => {
            let args = extract::ExtractCommandArgs {
                extractors: args.extractors,
                response: args.response,
            };
            ("extract", extract::run(&args))
        }
        Commands::Resolve(args) => {
            let args = resolve::ResolveCommandArgs {
                deps: args.deps,
                scenes: args.stores.scenes,
                kv: args.stores.kv,
            };
            ("resolve", resolve::run(&args, config).await)
        }
    }
}

fn handle_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{error}");
            0
        }
        _ => {
            emit_error(
                "input_usage_error",
                error.to_string(),
                json!({"kind": "cli_parse_error"}),
                3,
            );
            3
        }
    }
}

/// Reports go to stdout (exit 0 or 2); error payloads go to stderr.
fn emit_response(command: &'static str, response: CommandResponse) -> i32 {
    let emitted = match response.exit_code {
        0 | 2 => emit_json_stdout(&response.payload),
        3 | 1 => emit_json_stderr(&response.payload),
        other => {
            emit_error(
                "internal_error",
                format!("unexpected {command} exit code: {other}"),
                json!({"command": command}),
                1,
            );
            return 1;
        }
    };
    if emitted {
        response.exit_code
    } else {
        emit_error(
            "internal_error",
            format!("failed to serialize {command} response"),
            json!({"command": command}),
            1,
        );
        1
    }
}

fn emit_json_stdout(value: &Value) -> bool {
    match serde_json::to_string(value) {
        Ok(serialized) => {
            println!("{serialized}");
            true
        }
        Err(_) => false,
    }
}

fn emit_json_stderr(value: &Value) -> bool {
    match serde_json::to_string(value) {
        Ok(serialized) => {
            eprintln!("{serialized}");
            true
        }
        Err(_) => false,
    }
}

fn emit_error(error: &'static str, message: String, details: Value, code: i32) {
    let payload = CliError {
        error,
        message,
        code,
        details,
    };
    match serde_json::to_string(&payload) {
        Ok(serialized) => eprintln!("{serialized}"),
        Err(_) => eprintln!(
            "{{\"error\":\"internal_error\",\"message\":\"failed to serialize error\",\"code\":1}}"
        ),
    }
}
