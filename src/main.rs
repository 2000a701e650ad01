use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use hpx::cli::predict::PredictRequest;
use hpx::core::log::init_logging;

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

#[derive(Args)]
struct PredictArgs {
    /// Floor area in square meters (defaults to the smallest in the dataset)
    #[arg(long)]
    area: Option<f64>,

    /// Number of rooms
    #[arg(long)]
    room: Option<i64>,

    /// Neighbourhood, as spelled in the dataset
    #[arg(long)]
    address: Option<String>,

    /// House has no parking
    #[arg(long)]
    no_parking: bool,

    /// House has no warehouse
    #[arg(long)]
    no_warehouse: bool,

    /// House has no elevator
    #[arg(long)]
    no_elevator: bool,
}

impl From<PredictArgs> for PredictRequest {
    fn from(args: PredictArgs) -> PredictRequest {
        PredictRequest {
            area: args.area,
            room: args.room,
            address: args.address,
            parking: !args.no_parking,
            warehouse: !args.no_warehouse,
            elevator: !args.no_elevator,
        }
    }
}

impl From<Commands> for hpx::AppCommand {
    fn from(cmd: Commands) -> hpx::AppCommand {
        match cmd {
            Commands::Rate => hpx::AppCommand::Rate,
            Commands::Clean => hpx::AppCommand::Clean,
            Commands::Describe => hpx::AppCommand::Describe,
            Commands::Predict(args) => hpx::AppCommand::Predict(args.into()),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the current USD exchange rate
    Rate,
    /// Clean the dataset and cache the result
    Clean,
    /// Show the value ranges of the cleaned dataset
    Describe,
    /// Predict a house price with every configured model
    Predict(PredictArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => hpx::cli::setup::setup(cli.config_path.as_deref()),
        Some(cmd) => hpx::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
