use clap::Subcommand;
use colored::*;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use trialguard_ai::{HistoricalTrial, TrialQuery};

use super::utils::{client_from_env, or_dash, truncate};

#[derive(Subcommand)]
pub enum TrialsCommands {
    /// List historical trials
    List {
        /// Filter by phase (e.g. "Phase 3")
        #[arg(long)]
        phase: Option<String>,
        /// Filter by therapeutic area
        #[arg(long)]
        area: Option<String>,
        /// Filter by outcome (success/failed)
        #[arg(long)]
        outcome: Option<String>,
        /// Maximum number of trials
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Show one historical trial
    Show {
        /// NCT identifier
        nct_id: String,
    },
}

pub async fn handle_trials_command(command: TrialsCommands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        TrialsCommands::List {
            phase,
            area,
            outcome,
            limit,
        } => {
            list_trials(TrialQuery {
                phase,
                therapeutic_area: area,
                outcome,
                limit: Some(limit),
            })
            .await
        }
        TrialsCommands::Show { nct_id } => show_trial(&nct_id).await,
    }
}

async fn list_trials(query: TrialQuery) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;
    let trials = client.historical_trials(&query).await?;

    if trials.is_empty() {
        println!("{}", "No historical trials match these filters".yellow());
        return Ok(());
    }

    println!("{}", "Historical Trials".blue().bold());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["NCT ID", "Trial", "Phase", "Area", "Drug Class", "Outcome"]);

    for trial in &trials {
        table.add_row(vec![
            trial.nct_id.clone(),
            truncate(&trial.trial_name, 30),
            or_dash(&trial.phase),
            or_dash(&trial.therapeutic_area),
            or_dash(&trial.drug_class),
            outcome_text(&trial.outcome),
        ]);
    }

    println!("{}", table);
    println!("Total: {} trials", trials.len().to_string().cyan());
    Ok(())
}

async fn show_trial(nct_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;
    match client.historical_trial(nct_id).await? {
        Some(trial) => {
            print_trial_details(&trial);
            Ok(())
        }
        None => Err(format!("Trial {} not found in the historical database", nct_id).into()),
    }
}

fn outcome_text(outcome: &str) -> String {
    match outcome {
        "failed" | "terminated" => outcome.red().to_string(),
        "success" => outcome.green().to_string(),
        other => or_dash(other),
    }
}

fn print_trial_details(trial: &HistoricalTrial) {
    println!("{}", format!("{} - {}", trial.nct_id, trial.trial_name).blue().bold());
    println!();
    println!("{:<18} {}", "Phase:".bold(), or_dash(&trial.phase));
    println!("{:<18} {}", "Therapeutic area:".bold(), or_dash(&trial.therapeutic_area));
    println!("{:<18} {}", "Drug class:".bold(), or_dash(&trial.drug_class));
    println!("{:<18} {}", "Outcome:".bold(), outcome_text(&trial.outcome));
    if !trial.tags.is_empty() {
        println!("{:<18} {}", "Tags:".bold(), trial.tags.join(", "));
    }

    if !trial.extra.is_empty() {
        println!();
        println!("{}", "Details".cyan().bold());
        for (key, value) in &trial.extra {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!("  {}: {}", trialguard_cli::dashboard::humanize(key), rendered);
        }
    }
}
