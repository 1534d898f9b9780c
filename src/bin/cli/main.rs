//! CLI tool for inspecting paths through the arcvfs file layer.

mod commands;
mod exit_codes;
mod output;

use clap::{Parser, Subcommand, ValueEnum};

use arcvfs::FileLayer;

/// Archive-aware file inspection tool
#[derive(Parser)]
#[command(name = "arcvfs")]
#[command(author, version, about = "Archive-aware file inspection tool", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the (decompressed) content of a path to stdout
    Cat {
        /// File, compressed file or container/member path
        path: String,
    },

    /// List the members of an archive (alias: l)
    #[command(alias = "l")]
    List {
        /// Archive or file path
        path: String,
    },

    /// Print the CRC-32 and length of the (decompressed) content
    Crc {
        /// File, compressed file or container/member path
        path: String,
    },

    /// Show what a path resolves to (alias: i)
    #[command(alias = "i")]
    Info {
        /// File, compressed file or container/member path
        path: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let layer = FileLayer::builder()
        .notifier(|notice: arcvfs::Notice| eprintln!("Warning: {}", notice))
        .build();

    let exit_code = match &cli.command {
        Commands::Cat { path } => commands::cat(&layer, path),
        Commands::List { path } => commands::list(&layer, path, cli.format),
        Commands::Crc { path } => commands::crc(&layer, path, cli.format),
        Commands::Info { path } => commands::info(&layer, path, cli.format),
    };

    drop(layer);
    std::process::exit(exit_code.code());
}
