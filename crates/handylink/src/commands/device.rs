//! Device-level handlers: status, firmware, mode, clock offset, HSTP.

use serde_json::json;

use handylink_core::{Handy, ModeState};

use crate::cli::{FirmwareArgs, HstpArgs, HstpCommand, ModeArgs, OffsetArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn status(handy: &Handy, format: OutputFormat) -> Result<(), CliError> {
    let status = handy.status().await?;
    output::print(format, &status)
}

pub async fn firmware(
    handy: &Handy,
    args: &FirmwareArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    let report = handy.check_firmware().await?;
    if !args.latest {
        return output::print(format, &report);
    }

    let latest = handy.latest_firmware().await?;
    output::print(format, &json!({ "report": report, "latest": latest }))
}

pub async fn mode(handy: &Handy, args: ModeArgs, format: OutputFormat) -> Result<(), CliError> {
    let Some(raw) = args.mode else {
        let mode = handy.session()?.query_mode().await?;
        return output::print(format, &json!({ "mode": mode }));
    };

    let target: ModeState = raw.parse().map_err(|_| CliError::Unknown {
        what: "mode".into(),
        name: raw.clone(),
        expected: "hamp, hdsp, hssp, maintenance".into(),
    })?;
    if target == ModeState::Unknown {
        return Err(CliError::Validation {
            field: "mode".into(),
            reason: "UNKNOWN is not a settable mode".into(),
        });
    }

    let switched = handy.set_mode(target).await?;
    output::print(format, &json!({ "mode": target, "switched": switched }))
}

pub async fn offset(handy: &Handy, args: &OffsetArgs, format: OutputFormat) -> Result<(), CliError> {
    let offset = handy.compute_offset(args.samples).await?;
    output::print(format, &offset)
}

pub async fn hstp(handy: &Handy, args: HstpArgs, format: OutputFormat) -> Result<(), CliError> {
    let body = match args.command {
        HstpCommand::Status => handy.hstp_status().await?,
        HstpCommand::Offset { offset_ms } => handy.set_device_offset(offset_ms).await?,
        HstpCommand::Sync { timeout } => handy.start_hstp_sync(timeout).await?,
    };
    output::print(format, &body)
}
