use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use intrinsic::cli::value::ValueOptions;
use intrinsic::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for intrinsic::AppCommand {
    fn from(cmd: Commands) -> intrinsic::AppCommand {
        match cmd {
            Commands::Tickers => intrinsic::AppCommand::Tickers,
            Commands::Value {
                tickers,
                growth_rate,
                discount_rate,
                terminal_growth_rate,
                json,
            } => intrinsic::AppCommand::Value(ValueOptions {
                tickers,
                growth_rate,
                discount_rate,
                terminal_growth_rate,
                json,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List the configured tickers
    Tickers,
    /// Estimate intrinsic values for one or more tickers
    Value {
        /// Tickers to value; defaults to the configured default ticker
        tickers: Vec<String>,

        /// Expected growth rate in percent, used by the Graham formula
        #[arg(short, long, allow_negative_numbers = true)]
        growth_rate: Option<String>,

        /// Discount rate in percent, used by the DCF model
        #[arg(short, long, allow_negative_numbers = true)]
        discount_rate: Option<String>,

        /// Terminal growth rate in percent, used by the DCF model
        #[arg(short, long, allow_negative_numbers = true)]
        terminal_growth_rate: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => intrinsic::cli::setup::setup(),
        Some(cmd) => intrinsic::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
