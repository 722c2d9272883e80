//! Clap derive structures for the `handylink` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// handylink -- drive a Handy device through the vendor cloud relay
#[derive(Debug, Parser)]
#[command(
    name = "handylink",
    version,
    about = "Drive Handy devices through the cloud relay",
    long_about = "Pairs with a Handy by connection key and issues commands, \
        synchronized script playback and timed patterns.\n\n\
        Every invocation pairs first, so the connection key must be\n\
        available from --connection-key, HANDYLINK_CONNECTION_KEY,\n\
        the system keyring or the config file.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "HANDYLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device connection key (overrides profile)
    #[arg(long, short = 'k', env = "HANDYLINK_CONNECTION_KEY", global = true, hide_env_values = true)]
    pub connection_key: Option<String>,

    /// Relay base URL (overrides profile)
    #[arg(long, env = "HANDYLINK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "HANDYLINK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Query and action timeout in seconds
    #[arg(long, env = "HANDYLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate the connection key and print device info
    Pair,

    /// Show connectivity, mode, slide range and device info
    #[command(alias = "st")]
    Status,

    /// Report firmware compatibility
    #[command(alias = "fw")]
    Firmware(FirmwareArgs),

    /// Execute a command by kind (start, stop, set_velocity, play_script, ...)
    #[command(alias = "x")]
    Exec(ExecArgs),

    /// Synchronized script playback
    Script(ScriptArgs),

    /// Measure the clock offset against the relay
    Offset(OffsetArgs),

    /// Run a timed pattern (edge, speed, slow, default)
    Pattern(PatternArgs),

    /// Switch the device operating mode
    Mode(ModeArgs),

    /// Device-side time sync (HSTP)
    Hstp(HstpArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Firmware ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FirmwareArgs {
    /// Also query the OTA service for the latest release
    #[arg(long)]
    pub latest: bool,
}

// ── Exec ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Command kind
    pub kind: String,

    /// Command parameters as a JSON object
    #[arg(long, default_value = "{}")]
    pub params: String,
}

// ── Script ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScriptArgs {
    #[command(subcommand)]
    pub command: ScriptCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScriptCommand {
    /// Set up and start a script, then follow its state
    Play {
        /// Script URL (CSV or funscript the relay can fetch)
        url: String,

        /// Script position to start from, in milliseconds
        #[arg(long, default_value_t = 0)]
        start: i64,

        /// Loop the script
        #[arg(long = "loop")]
        looping: bool,

        /// Use this clock offset instead of measuring one
        #[arg(long)]
        offset: Option<f64>,

        /// Keep following the playback state until it stops
        #[arg(long)]
        follow: bool,
    },

    /// Stop script playback
    Stop,

    /// Seek to a script position in milliseconds
    Seek {
        time: i64,

        /// Use this clock offset instead of measuring one
        #[arg(long)]
        offset: Option<f64>,
    },

    /// Enable or disable looping
    Loop {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Query the device playback state
    State,
}

// ── Offset ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct OffsetArgs {
    /// Number of round-trip samples
    #[arg(long, short = 'n')]
    pub samples: Option<usize>,
}

// ── Pattern ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PatternArgs {
    /// Pattern name
    pub name: String,

    /// Velocity the speed/slow patterns adjust from
    #[arg(long)]
    pub current_velocity: Option<u8>,
}

// ── Mode ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ModeArgs {
    /// Target mode (hamp, hdsp, hssp, maintenance); omit to query
    pub mode: Option<String>,
}

// ── HSTP ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HstpArgs {
    #[command(subcommand)]
    pub command: HstpCommand,
}

#[derive(Debug, Subcommand)]
pub enum HstpCommand {
    /// Show the device's HSTP settings
    Status,

    /// Set the device-side offset in milliseconds
    Offset {
        #[arg(allow_hyphen_values = true)]
        offset_ms: i64,
    },

    /// Let the device synchronize its own clock
    Sync {
        /// Device-side sync timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the resolved config (keys masked)
    Show,

    /// Create or update a profile
    SetProfile {
        name: String,

        /// Relay base URL
        #[arg(long)]
        api_url: Option<String>,

        /// Environment variable holding the connection key
        #[arg(long)]
        connection_key_env: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Store the connection key for a profile in the system keyring
    SetKey {
        /// The connection key
        key: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
