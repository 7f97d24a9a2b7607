//! Reference CLI for the quest pipeline: `info` and `convert`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, Level};

use psoq::commands::convert::ConvertFormat;
use psoq::commands::{convert, info, OutputFormat};

#[derive(Parser)]
#[command(
    name = "psoq",
    about = "Quest toolkit for PSO Gamecube Episode I&II .bin/.dat/.qst files",
    version
)]
struct Cli {
    /// Logging verbosity
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Output format for `info`
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print a report for a `.bin`+`.dat` pair or a `.qst` file
    Info {
        /// One `.qst` path, or a `.bin` and `.dat` path in either order
        inputs: Vec<PathBuf>,
    },
    /// Convert a quest source into one of the four target formats
    Convert {
        /// One `.qst` path, or a `.bin` and `.dat` path in either order
        #[arg(num_args = 1..=2)]
        inputs: Vec<PathBuf>,
        /// Target format
        format: ConvertFormat,
        /// One `.qst` output path, or `.bin`/`.dat` output paths in
        /// either order
        #[arg(num_args = 1..=2)]
        outputs: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Info { inputs } => info::run(&inputs).and_then(|report| info::render(&report, cli.format)).map(|text| {
            println!("{text}");
        }),
        Commands::Convert { inputs, format, outputs } => convert::run(&inputs, format, &outputs),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "psoq failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
