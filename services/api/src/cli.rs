use crate::report::{run_dashboard_report, run_score_report, DashboardReportArgs, ScoreReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use cmmc_tracker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "CMMC Assessment Tracker",
    about = "Track control implementation, POA&M items, and SPRS scores for a CMMC assessment",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Explain the SPRS score of an assessment snapshot control by control
    Score(ScoreReportArgs),
    /// Print the dashboard rollup for an assessment snapshot
    Dashboard(DashboardReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score_report(args),
        Command::Dashboard(args) => run_dashboard_report(args),
    }
}
