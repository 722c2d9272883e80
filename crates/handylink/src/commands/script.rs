//! Script playback handlers.

use serde_json::{Map, Value, json};

use handylink_core::Handy;

use crate::cli::{OutputFormat, ScriptArgs, ScriptCommand};
use crate::error::CliError;
use crate::output;

pub async fn handle(handy: &Handy, args: ScriptArgs, format: OutputFormat) -> Result<(), CliError> {
    match args.command {
        ScriptCommand::Play {
            url,
            start,
            looping,
            offset,
            follow,
        } => {
            let mut params = Map::new();
            params.insert("url".into(), Value::String(url));
            params.insert("startTime".into(), json!(start));
            params.insert("loop".into(), Value::Bool(looping));
            if let Some(offset) = offset {
                params.insert("csOffset".into(), json!(offset));
            }

            let result = handy.execute("play_script", &Value::Object(params)).await?;
            output::print(format, &result)?;

            if follow {
                follow_playback(handy, format).await?;
            }
            Ok(())
        }
        ScriptCommand::Stop => output::print(format, &handy.stop_script().await?),
        ScriptCommand::Seek { time, offset } => {
            output::print(format, &handy.seek_script(time, offset).await?)
        }
        ScriptCommand::Loop { enabled } => output::print(format, &handy.set_loop(enabled).await?),
        ScriptCommand::State => output::print(format, &handy.refresh_script_state().await?),
    }
}

/// Print every published playback state until the device stops playing.
/// Ctrl-C stops the script before returning.
async fn follow_playback(handy: &Handy, format: OutputFormat) -> Result<(), CliError> {
    let mut states = handy.subscribe_script()?;
    loop {
        let snapshot = states.borrow_and_update().clone();
        output::print(format, &snapshot)?;
        if !snapshot.is_playing() {
            return Ok(());
        }

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping script");
                handy.stop_script().await?;
                return Ok(());
            }
        }
    }
}
