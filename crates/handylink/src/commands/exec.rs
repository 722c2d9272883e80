//! Generic `exec <kind> --params <json>` handler.

use serde_json::Value;

use handylink_core::Handy;

use crate::cli::{ExecArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(handy: &Handy, args: &ExecArgs, format: OutputFormat) -> Result<(), CliError> {
    let params: Value = serde_json::from_str(&args.params)?;
    if !(params.is_object() || params.is_null()) {
        return Err(CliError::Validation {
            field: "params".into(),
            reason: "expected a JSON object".into(),
        });
    }

    let result = handy.execute(&args.kind, &params).await?;
    output::print(format, &result)
}
