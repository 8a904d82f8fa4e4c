use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// REST routes generated from model descriptors.
///
/// RouteForge reads model definitions from a TOML file, generates one CRUD
/// route per enabled verb, and can exercise them in-process or serve them.
#[derive(Parser)]
#[command(
    name = "route-forge",
    version,
    about = "Generate, check and serve REST routes from model descriptors",
    after_help = "Use 'route-forge <command> --help' for more information about a command.",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Global options available to all subcommands.
#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Configuration file path [env: ROUTE_FORGE_CONFIG]
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        env = "ROUTE_FORGE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// Output format: human (default), json, plain
    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = ["human", "json", "plain"]
    )]
    pub format: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output [env: NO_COLOR]
    #[arg(long = "no-color", global = true, env = "NO_COLOR")]
    pub no_color: bool,
}

/// Top-level subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Print the generated route table
    Routes(RoutesArgs),

    /// Run flow tasks against the generated routes in-process
    Check(CheckArgs),

    /// Serve the generated routes over HTTP
    Serve(ServeArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

// ---------------------------------------------------------------------------
// Individual command argument structs
// ---------------------------------------------------------------------------

/// Arguments for `route-forge routes`.
#[derive(Args)]
pub struct RoutesArgs {
    /// Only show routes for this model
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,
}

/// Arguments for `route-forge check`.
#[derive(Args)]
pub struct CheckArgs {
    /// TOML file with [[tasks]] (default: POST then GET per model)
    #[arg(short = 't', long = "tasks")]
    pub tasks: Option<PathBuf>,

    /// Bearer token sent with every synthetic request
    #[arg(long = "token", env = "ROUTE_FORGE_TOKEN")]
    pub token: Option<String>,
}

/// Arguments for `route-forge serve`.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(short = 'b', long = "bind", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,
}

/// Arguments for `route-forge completions`.
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
