mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deepsky", about = "Deep-sky astrophotography session orchestrator")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full session pipeline (convert, calibrate, register, stack, post)
    Run(commands::run::RunArgs),
    /// Convert a directory of raw captures to the working format
    Convert(commands::convert::ConvertArgs),
    /// Calibrate a sequence against master frames
    Calibrate(commands::calibrate::CalibrateArgs),
    /// Register (align) a sequence
    Register(commands::register::RegisterArgs),
    /// Stack a sequence into a single image
    Stack(commands::stack::StackArgs),
    /// Run the cosmetic post-processing chain on a stacked image
    Post(commands::post::PostArgs),
    /// Sanity-check captured frames before processing
    Check(commands::check::CheckArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Convert(args) => commands::convert::run(args),
        Commands::Calibrate(args) => commands::calibrate::run(args),
        Commands::Register(args) => commands::register::run(args),
        Commands::Stack(args) => commands::stack::run(args),
        Commands::Post(args) => commands::post::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
