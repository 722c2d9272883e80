//! Command dispatch: bridges CLI args -> facade calls -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod exec;
pub mod pattern;
pub mod script;

use handylink_core::{DeviceInfo, Handy};

use crate::cli::{Command, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    handy: &Handy,
    info: &DeviceInfo,
    format: OutputFormat,
) -> Result<(), CliError> {
    match cmd {
        Command::Pair => output::print(format, info),
        Command::Status => device::status(handy, format).await,
        Command::Firmware(args) => device::firmware(handy, &args, format).await,
        Command::Mode(args) => device::mode(handy, args, format).await,
        Command::Offset(args) => device::offset(handy, &args, format).await,
        Command::Hstp(args) => device::hstp(handy, args, format).await,
        Command::Exec(args) => exec::handle(handy, &args, format).await,
        Command::Script(args) => script::handle(handy, args, format).await,
        Command::Pattern(args) => pattern::handle(handy, &args, format).await,
        // Config and Completions are handled before pairing
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
