use std::path::PathBuf;

use crate::cmd::{CommandResponse, Runtime};
use crate::config::KernelConfig;

#[derive(Debug, Clone)]
pub struct ResolveCommandArgs {
    pub deps: PathBuf,
    pub scenes: Option<PathBuf>,
    pub kv: Option<PathBuf>,
}

/// Prints resolved values keyed by dependency id.
pub async fn run(args: &ResolveCommandArgs, config: &KernelConfig) -> CommandResponse {
    let resolved = match Runtime::build(config, args.scenes.as_deref(), args.kv.as_deref()) {
        Ok(runtime) => runtime.resolve_file(Some(&args.deps)).await,
        Err(error) => Err(error),
    };
    match resolved {
        Ok(values) => CommandResponse::report(&values, 0, "resolved values"),
        Err(error) => error.into(),
    }
}
