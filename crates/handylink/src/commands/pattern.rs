//! Pattern handler: schedule, then wait for the last step.
//!
//! The process owns the session, so returning early would cancel the run.

use serde_json::json;

use handylink_core::Handy;

use crate::cli::{OutputFormat, PatternArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(handy: &Handy, args: &PatternArgs, format: OutputFormat) -> Result<(), CliError> {
    let params = json!({ "currentVelocity": args.current_velocity });
    let ticket = handy.execute_pattern(&args.name, &params).await?;
    output::print(format, &ticket)?;

    tokio::select! {
        () = ticket.wait() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(pattern = %ticket.pattern, "interrupted, cancelling pattern");
            handy.cancel_pattern()?;
        }
    }
    Ok(())
}
