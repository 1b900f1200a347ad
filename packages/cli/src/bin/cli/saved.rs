use clap::Subcommand;
use colored::*;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use trialguard_ai::{SavedAnalysisSummary, SearchQuery};

use super::utils::{client_from_env, or_dash, truncate};

#[derive(Subcommand)]
pub enum SavedCommands {
    /// List saved analyses, newest first
    List {
        /// Maximum number of analyses
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },
    /// Show the dashboard of a saved analysis
    Show {
        /// Analysis ID
        id: String,
    },
    /// Search saved analyses by trial name or risk level
    Search {
        /// Text to search for
        query: Option<String>,
        /// Only analyses with this risk level (low/moderate/high)
        #[arg(long)]
        risk_level: Option<String>,
        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

pub async fn handle_saved_command(command: SavedCommands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SavedCommands::List { limit } => {
            let client = client_from_env()?;
            let analyses = client.saved_analyses(Some(limit)).await?;
            print_summaries(&analyses, "Saved Analyses");
            Ok(())
        }
        SavedCommands::Show { id } => {
            let client = client_from_env()?;
            let result = client.saved_analysis(&id).await?;
            println!("{}", trialguard_cli::render_dashboard(&result));
            Ok(())
        }
        SavedCommands::Search {
            query,
            risk_level,
            limit,
        } => {
            let client = client_from_env()?;
            let results = client
                .search_analyses(&SearchQuery {
                    query,
                    risk_level,
                    limit: Some(limit),
                })
                .await?;
            print_summaries(&results, "Search Results");
            Ok(())
        }
    }
}

fn print_summaries(analyses: &[SavedAnalysisSummary], title: &str) {
    if analyses.is_empty() {
        println!("{}", "No saved analyses found".yellow());
        println!("{}", "Use 'trialguard analyze' to run your first analysis".dimmed());
        return;
    }

    println!("{}", title.blue().bold());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Trial", "Score", "Risk", "Created"]);

    for analysis in analyses {
        table.add_row(vec![
            analysis.analysis_id.clone(),
            truncate(&analysis.trial_name, 30),
            analysis
                .overall_score
                .map(|s| format!("{:.0}", s))
                .unwrap_or_else(|| "-".to_string()),
            or_dash(analysis.risk_level.as_deref().unwrap_or_default()),
            or_dash(&format_date(analysis.created_at.as_deref().unwrap_or_default())),
        ]);
    }

    println!("{}", table);
    println!("Total: {} analyses", analyses.len().to_string().cyan());
}

/// `2025-01-01T10:30:00.123456` -> `2025-01-01 10:30`
fn format_date(raw: &str) -> String {
    match raw.split_once('T') {
        Some((date, time)) => format!("{} {}", date, time.get(..5).unwrap_or(time)),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2025-01-01T10:30:00.123456"), "2025-01-01 10:30");
        assert_eq!(format_date("2025-01-01"), "2025-01-01");
        assert_eq!(format_date(""), "");
    }
}
