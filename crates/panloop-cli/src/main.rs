//! CLI for panloop — periodic control loops and Pelco-D pan/tilt/zoom
//! tooling.

mod commands;

use clap::{Parser, Subcommand};

use commands::encode::EncodeCommand;

#[derive(Parser)]
#[command(name = "panloop")]
#[command(about = "panloop — periodic control loops and Pelco-D PTZ tooling")]
#[command(version = panloop_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the periodic control loop until SIGINT/SIGTERM
    Run {
        /// Configuration file (key=value lines). Without one, built-in
        /// defaults and dry-run output are used.
        #[arg(long)]
        config: Option<String>,

        /// Dispatch mode: inline (strict priority order) or threaded
        /// (overlap I/O-bound tasks within a tick)
        #[arg(long, default_value = "inline", value_parser = ["inline", "threaded"])]
        mode: String,

        /// Write per-task statistics as JSON on exit
        #[arg(long)]
        stats_json: Option<String>,
    },

    /// Build one Pelco-D frame and print it as hex
    Encode {
        #[command(subcommand)]
        command: EncodeCommand,
    },

    /// Parse a Pelco-D byte stream and print every decoded frame
    Decode {
        /// Hex-encoded bytes, e.g. "FF 01 00 51 00 00 52"
        #[arg(long)]
        hex: Option<String>,

        /// Read raw bytes from standard input instead
        #[arg(long)]
        stdin: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            mode,
            stats_json,
        } => commands::run::run(config.as_deref(), &mode, stats_json.as_deref()),
        Commands::Encode { command } => commands::encode::run(command),
        Commands::Decode { hex, stdin } => commands::decode::run(hex.as_deref(), stdin),
    }
}
