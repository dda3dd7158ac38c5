use std::path::PathBuf;
use std::sync::Arc;

use crate::cmd::{CommandError, CommandResponse, Runtime, load_document, read_value};
use crate::config::KernelConfig;
use crate::domain::assertion::{AssertionGroup, AssertionGroupResult};
use crate::domain::error::GroupError;
use crate::engine::r#assert::run_group_with_retry;

/// Input arguments for assert command execution API.
#[derive(Debug, Clone)]
pub struct AssertCommandArgs {
    pub group: PathBuf,
    pub response: PathBuf,
    pub deps: Option<PathBuf>,
    pub scenes: Option<PathBuf>,
    pub kv: Option<PathBuf>,
}

/// Exit 0 when the group passes, 2 when it fails.
pub async fn run(args: &AssertCommandArgs, config: &KernelConfig) -> CommandResponse {
    match execute(args, config).await {
        Ok(result) => {
            let exit_code = if result.passed { 0 } else { 2 };
            CommandResponse::report(&result, exit_code, "assertion group result")
        }
        Err(error) => error.into(),
    }
}

async fn execute(
    args: &AssertCommandArgs,
    config: &KernelConfig,
) -> Result<AssertionGroupResult, CommandError> {
    let mut group: AssertionGroup = load_document(&args.group, "assertion group")?;
    group.validate().map_err(map_group_error)?;
    let response = read_value(&args.response, "response")?;
    group.bind_response(&response);

    let runtime = Runtime::build(config, args.scenes.as_deref(), args.kv.as_deref())?;
    let resolved = runtime.resolve_file(args.deps.as_deref()).await?;
    run_group_with_retry(&group, Arc::new(resolved))
        .await
        .map_err(map_group_error)
}

fn map_group_error(error: GroupError) -> CommandError {
    match error {
        GroupError::InvalidOptions { .. } => CommandError::InputUsage(error.to_string()),
        GroupError::Timeout { .. } => CommandError::GroupTimeout(error.to_string()),
    }
}
