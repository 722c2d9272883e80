//! Output formatting: JSON, compact JSON, YAML.

use std::io::{self, Write};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render a serde-serializable value in the chosen format.
pub fn render<T: serde::Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)
            .map_err(|e| CliError::Internal(format!("YAML serialization failed: {e}")))?,
    };
    Ok(rendered)
}

/// Render and print to stdout.
pub fn print<T: serde::Serialize + ?Sized>(format: OutputFormat, data: &T) -> Result<(), CliError> {
    let rendered = render(format, data)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", rendered.trim_end())?;
    Ok(())
}
