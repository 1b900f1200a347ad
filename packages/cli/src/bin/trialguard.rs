use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;

mod cli;

use cli::report::ReportCommands;
use cli::saved::SavedCommands;
use cli::trials::TrialsCommands;

#[derive(Parser)]
#[command(name = "trialguard")]
#[command(about = "TrialGuard CLI - clinical trial protocol risk analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enter a protocol and run a streaming risk analysis
    Analyze {
        /// Prefill the form from a protocol PDF
        #[arg(long)]
        pdf: Option<PathBuf>,
        /// Skip the interactive form (requires --pdf with every required field)
        #[arg(short, long)]
        yes: bool,
        /// Write the normalized result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not save the analysis on the backend
        #[arg(long)]
        no_save: bool,
    },
    /// Extract protocol data from a PDF and print it as JSON
    ParsePdf {
        /// Protocol PDF file
        file: PathBuf,
    },
    /// Ask follow-up questions about a saved analysis
    Chat {
        /// Saved analysis ID to discuss
        analysis_id: String,
    },
    /// Browse the historical trials database
    #[command(subcommand)]
    Trials(TrialsCommands),
    /// Browse saved analyses
    #[command(subcommand)]
    Saved(SavedCommands),
    /// Show or delete analyses from recent runs
    #[command(subcommand)]
    Report(ReportCommands),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    trialguard_cli::init_logging();

    let cli = Cli::parse();

    match handle_command(cli.command).await {
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn handle_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Analyze {
            pdf,
            yes,
            output,
            no_save,
        } => {
            cli::analyze::run_analysis(cli::analyze::AnalyzeOptions {
                pdf,
                interactive: !yes,
                output,
                save: !no_save,
            })
            .await
        }
        Commands::ParsePdf { file } => cli::analyze::parse_pdf(&file).await,
        Commands::Chat { analysis_id } => cli::chat::run_chat(&analysis_id).await,
        Commands::Trials(trials_cmd) => cli::trials::handle_trials_command(trials_cmd).await,
        Commands::Saved(saved_cmd) => cli::saved::handle_saved_command(saved_cmd).await,
        Commands::Report(report_cmd) => cli::report::handle_report_command(report_cmd).await,
    }
}
