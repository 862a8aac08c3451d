use clap::{Args, Parser, Subcommand};

use hearth::api::args::{
    CompareArgs, ProjectArgs, ReceiptArgs, build_comparison, build_parameters, build_receipt,
};
use hearth::api::render::{comparison_table, projection_table};
use hearth::core::{ModelError, compare_vehicles, run_projection};

#[derive(Parser, Debug)]
#[command(
    name = "hearth",
    about = "UK household projection: take-home pay, ISA/LISA/pension growth, first home and retirement drawdown"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level for hearth events; RUST_LOG overrides it"
    )]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(default_value_t = 8080)]
        port: u16,
    },
    /// Run the year-by-year projection.
    Project(ProjectCommand),
    /// Compare savings vehicles for one net pound.
    Compare(CompareCommand),
    /// Print a pay receipt.
    Receipt(ReceiptArgs),
}

#[derive(Args, Debug)]
struct ProjectCommand {
    #[arg(long, help = "Print the full result as JSON")]
    json: bool,
    #[command(flatten)]
    args: ProjectArgs,
}

#[derive(Args, Debug)]
struct CompareCommand {
    #[arg(long, help = "Print the full result as JSON")]
    json: bool,
    #[command(flatten)]
    args: CompareArgs,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = hearth::logging::init_logging(&cli.log_level) {
        eprintln!("Logging disabled: {e}");
    }

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Serve { port } => hearth::api::run_http_server(port).await?,
        Command::Project(cmd) => {
            let params = build_parameters(&cmd.args)?;
            let result = run_projection(&params)?;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", projection_table(&result));
            }
        }
        Command::Compare(cmd) => {
            let (rules, inputs) = build_comparison(&cmd.args)?;
            let comparison = compare_vehicles(&rules, &inputs)?;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                print!("{}", comparison_table(&comparison));
            }
        }
        Command::Receipt(args) => {
            let receipt = build_receipt(&args)?;
            println!("{}", receipt.render());
        }
    }
    Ok(())
}
