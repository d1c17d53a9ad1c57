use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use kifi_background::StartReason;
use kifi_types::Env;

#[derive(Parser)]
#[command(
    name = "kifi",
    about = "Kifi extension background, outside the browser",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON file holding the persisted config.
    #[arg(long, global = true, default_value = "kifi-store.json")]
    pub store: PathBuf,

    /// TOML file with background settings.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Use this environment instead of the stored one.
    #[arg(long, global = true)]
    pub env: Option<Env>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect or change the persisted config
    Config(ConfigArgs),
    /// Route one message and print the reply
    Dispatch(DispatchArgs),
    /// Serve messages over native-messaging framing on stdin/stdout
    Host(HostArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective config
    Show,
    /// Store a value
    Set { key: String, value: String },
    /// Delete a key
    Remove { key: String },
    /// Switch environment
    Env { env: Env },
}

#[derive(Args)]
pub struct DispatchArgs {
    /// Message JSON, e.g. '{"type":"get_conf"}'
    pub message: String,
    /// Send as if from a tab showing this URL.
    #[arg(long)]
    pub tab_url: Option<String>,
    /// Answer server calls locally instead of over HTTP.
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct HostArgs {
    /// Run the start-up sequence for this reason before serving.
    #[arg(long)]
    pub start: Option<StartReason>,
    #[arg(long)]
    pub offline: bool,
}
