use clap::Subcommand;
use colored::*;
use inquire::Confirm;

use super::utils::{client_from_env, spinner};

/// Analyses the backend still holds from recent runs
#[derive(Subcommand)]
pub enum ReportCommands {
    /// Show the dashboard of a recent analysis
    Show {
        /// Analysis ID
        id: String,
    },
    /// Delete a recent analysis from the backend
    Delete {
        /// Analysis ID
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn handle_report_command(command: ReportCommands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ReportCommands::Show { id } => show_report(&id).await,
        ReportCommands::Delete { id, yes } => delete_report(&id, yes).await,
    }
}

async fn show_report(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;
    let pb = spinner("Loading analysis...")?;
    let result = client.get_analysis(id).await;
    pb.finish_and_clear();

    println!("{}", trialguard_cli::render_dashboard(&result?));
    Ok(())
}

async fn delete_report(id: &str, skip_confirmation: bool) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;

    let confirmed = if skip_confirmation {
        true
    } else {
        Confirm::new(&format!("Are you sure you want to delete analysis '{}'?", id))
            .with_default(false)
            .prompt()?
    };

    if !confirmed {
        println!("{}", "Operation cancelled".yellow());
        return Ok(());
    }

    match client.delete_analysis(id).await {
        Ok(()) => {
            println!("{}", format!("Analysis '{}' deleted", id).green());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Failed to delete analysis: {}", e).red());
            Err(e.into())
        }
    }
}
