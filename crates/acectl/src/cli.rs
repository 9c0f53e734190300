//! Clap derive structures for the `acectl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// acectl -- control an ACE filament hub through Moonraker
#[derive(Debug, Parser)]
#[command(
    name = "acectl",
    version,
    about = "Control ACE filament hubs from the command line",
    long_about = "Drive an ACE multi-slot filament dryer/feeder through the Moonraker\n\
        host it is attached to: inspect slots, change tools, run the dryer,\n\
        feed and retract filament, and manage feed assist.",
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
    /// Host profile to use
    #[arg(long, short = 'p', env = "ACECTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Moonraker URL (overrides profile)
    #[arg(long, short = 'H', env = "ACECTL_HOST", global = true)]
    pub host: Option<String>,

    /// Moonraker API key
    #[arg(long, env = "ACECTL_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ACECTL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ACECTL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ACECTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show device, dryer and slot status
    #[command(alias = "st")]
    Status,

    /// Follow live status and notices until interrupted
    Watch(WatchArgs),

    /// Pull a fresh status snapshot
    Refresh,

    /// Change or unload the active tool
    Tool(ToolArgs),

    /// Control the filament dryer
    Dryer(DryerArgs),

    /// Park a slot's filament at the toolhead
    Park {
        /// Slot index
        slot: u8,
    },

    /// Feed filament from a slot
    Feed(MotionArgs),

    /// Retract filament into a slot
    Retract(MotionArgs),

    /// Manage feed assist
    #[command(alias = "fa")]
    Assist(AssistArgs),

    /// Edit slot metadata
    Slot(SlotArgs),

    /// Spool handling settings
    Spool(SpoolArgs),

    /// Send an arbitrary host command (KEY=VALUE parameters)
    Raw {
        /// Command name, e.g. ACE_GET_STATUS
        name: String,
        /// Parameters as KEY=VALUE
        params: Vec<String>,
    },

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only print notices, not status changes
    #[arg(long)]
    pub notices_only: bool,
}

// ── Tool ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub command: ToolCommand,
}

#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    /// Load the given tool (slot index)
    Change {
        /// Tool index
        tool: u8,
    },
    /// Unload the current tool
    Unload,
}

// ── Dryer ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DryerArgs {
    #[command(subcommand)]
    pub command: DryerCommand,
}

#[derive(Debug, Subcommand)]
pub enum DryerCommand {
    /// Start drying
    Start {
        /// Target temperature in °C (20-60, default from config)
        #[arg(long, short = 't')]
        temp: Option<i64>,
        /// Duration in minutes (default from config)
        #[arg(long, short = 'd')]
        duration: Option<i64>,
    },
    /// Stop drying
    Stop,
}

// ── Feed / Retract ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MotionArgs {
    /// Slot index
    pub slot: u8,

    /// Length in mm (default from config)
    #[arg(long, short = 'l')]
    pub length: Option<i64>,

    /// Speed (default from config)
    #[arg(long, short = 's')]
    pub speed: Option<i64>,
}

// ── Feed assist ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AssistArgs {
    #[command(subcommand)]
    pub command: AssistCommand,
}

#[derive(Debug, Subcommand)]
pub enum AssistCommand {
    /// Toggle feed assist on a slot, moving it off any other slot
    Toggle {
        /// Slot index
        slot: u8,
    },
    /// Enable feed assist on a slot
    On {
        /// Slot index
        slot: u8,
    },
    /// Disable feed assist on a slot
    Off {
        /// Slot index
        slot: u8,
    },
    /// Disable feed assist on every slot
    AllOff,
}

// ── Spool ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SpoolArgs {
    #[command(subcommand)]
    pub command: SpoolCommand,
}

#[derive(Debug, Subcommand)]
pub enum SpoolCommand {
    /// Switch to the next matching slot when a spool runs out
    Endless {
        #[arg(value_enum)]
        action: EndlessAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EndlessAction {
    On,
    Off,
    /// Ask the host for the current setting
    Status,
}

// ── Slot edits ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SlotArgs {
    #[command(subcommand)]
    pub command: SlotCommand,
}

#[derive(Debug, Subcommand)]
pub enum SlotCommand {
    /// Set the filament color (#rrggbb)
    Color {
        /// Slot index
        slot: u8,
        /// Color as #rrggbb
        color: String,
    },
    /// Set the material type
    #[command(name = "type")]
    Material {
        /// Slot index
        slot: u8,
        /// Material name (PLA, PETG, ABS, ASA, ...)
        material: String,
    },
    /// Set the printing temperature
    Temp {
        /// Slot index
        slot: u8,
        /// Temperature in °C
        temperature: i64,
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
    /// Show the effective configuration (secrets redacted)
    Show,
    /// Set a key on the active profile
    Set {
        /// Config key (host, api_key, api_key_env, insecure, timeout, slot_count)
        key: String,
        /// New value
        value: String,
    },
    /// List configured profiles
    Profiles,
    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },
    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
