use std::path::PathBuf;

use crate::cmd::{CommandError, CommandResponse, load_document, read_value};
use crate::domain::extractor::{ExtractionReport, Extractor};
use crate::engine::extract::extract_all;

#[derive(Debug, Clone)]
pub struct ExtractCommandArgs {
    pub extractors: PathBuf,
    pub response: PathBuf,
}

/// Exit 0 when every extractor produced a value, 2 otherwise.
pub fn run(args: &ExtractCommandArgs) -> CommandResponse {
    match execute(args) {
        Ok(report) => {
            let exit_code = if report.is_complete() { 0 } else { 2 };
            CommandResponse::report(&report, exit_code, "extraction report")
        }
        Err(error) => error.into(),
    }
}

fn execute(args: &ExtractCommandArgs) -> Result<ExtractionReport, CommandError> {
    let extractors: Vec<Extractor> = load_document(&args.extractors, "extractors")?;
    let response = read_value(&args.response, "response")?;
    Ok(extract_all(&extractors, &response))
}
