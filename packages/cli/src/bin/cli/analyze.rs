use std::path::{Path, PathBuf};

use colored::*;
use inquire::{Select, Text};
use serde_json::Value;
use trialguard_ai::{ProtocolValidation, TrialGuardClient};
use trialguard_core::{FieldKind, FieldSpec, PROTOCOL_FIELDS};
use trialguard_form::ProtocolForm;

use super::utils::{client_from_env, progress_bar, spinner};

const SKIP_CHOICE: &str = "(skip)";

pub struct AnalyzeOptions {
    pub pdf: Option<PathBuf>,
    pub interactive: bool,
    pub output: Option<PathBuf>,
    pub save: bool,
}

pub async fn run_analysis(options: AnalyzeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;
    let mut form = ProtocolForm::new();

    let extracted = match &options.pdf {
        Some(path) => {
            let protocol = extract_protocol(&client, path).await?;
            let filled = form.prefill_from_extracted(&protocol);
            println!(
                "{} Prefilled {} fields from {}",
                "✓".green(),
                filled.to_string().cyan(),
                path.display()
            );
            Some(protocol)
        }
        None => None,
    };

    if options.interactive {
        fill_form(&mut form)?;
    } else if !form.validate_form() {
        print_form_errors(&form);
        return Err("Protocol is incomplete; run without --yes to fill in the missing fields".into());
    }

    let mut request = form.to_request();
    if let Some(extracted) = &extracted {
        request = request.with_extracted(extracted);
    }
    let trial_name = form.value("trial_name");

    report_completeness(&client, &request.protocol).await;

    println!();
    println!("{}", format!("Analyzing {}", trial_name).blue().bold());
    let pb = progress_bar()?;
    pb.set_message("Submitting protocol...");

    let outcome = client
        .analyze_with_progress(&request, |update| {
            if let Some(percent) = update.progress_percent {
                pb.set_position(percent.clamp(0.0, 100.0) as u64);
            }
            if !update.message.is_empty() {
                pb.set_message(update.message.clone());
            }
        })
        .await;
    let result = match outcome {
        Ok(result) => {
            pb.finish_and_clear();
            result
        }
        Err(e) => {
            pb.abandon_with_message("Analysis failed".red().to_string());
            return Err(e.into());
        }
    };

    println!("{}", trialguard_cli::render_dashboard(&result));

    if options.save {
        if client
            .record_analysis(&request.protocol, &result, &trial_name)
            .await
        {
            if let Some(id) = &result.analysis_id {
                println!("{}", format!("Saved as {}", id).dimmed());
            }
        } else {
            println!("{}", "Analysis was not saved".yellow());
        }
    }

    if let Some(path) = &options.output {
        std::fs::write(path, serde_json::to_string_pretty(&result)?)?;
        println!("{} Wrote {}", "✓".green(), path.display());
    }

    Ok(())
}

pub async fn parse_pdf(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;
    let protocol = extract_protocol(&client, path).await?;
    println!("{}", serde_json::to_string_pretty(&protocol)?);
    Ok(())
}

/// Server-side completeness check; informational only
async fn report_completeness(client: &TrialGuardClient, protocol: &Value) {
    match client.validate_protocol(protocol).await {
        Ok(report) => print_validation(&report),
        Err(e) => tracing::warn!("Protocol completeness check unavailable: {}", e),
    }
}

fn print_validation(report: &ProtocolValidation) {
    println!();
    println!(
        "{} {}",
        "Completeness:".bold(),
        completeness_text(report.completeness_score)
    );
    for issue in &report.errors {
        println!("  {} {}: {}", "✗".red(), issue.field, issue.message.red());
    }
    for issue in &report.warnings {
        println!("  {} {}: {}", "!".yellow(), issue.field, issue.message.yellow());
    }
}

fn completeness_text(score: f64) -> String {
    let text = format!("{:.0}%", (score * 100.0).clamp(0.0, 100.0));
    if score >= 0.9 {
        text.green().to_string()
    } else if score >= 0.7 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

async fn extract_protocol(
    client: &TrialGuardClient,
    path: &Path,
) -> Result<Value, Box<dyn std::error::Error>> {
    let pb = spinner(&format!("Extracting protocol from {}...", path.display()))?;
    match client.parse_pdf(path).await {
        Ok(protocol) => {
            pb.finish_and_clear();
            Ok(protocol)
        }
        Err(e) => {
            pb.abandon_with_message("Extraction failed".red().to_string());
            Err(e.into())
        }
    }
}

/// Walk every step, then keep returning to the first invalid step until the
/// whole form validates
fn fill_form(form: &mut ProtocolForm) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "Protocol Details".blue().bold());

    loop {
        while !form.should_submit() {
            let Some(step) = form.step() else { break };
            println!();
            println!(
                "{}",
                format!(
                    "Step {} of {}: {}",
                    form.current_step() + 1,
                    form.total_steps(),
                    step.title()
                )
                .cyan()
                .bold()
            );

            for spec in form.current_step_fields() {
                prompt_field(form, spec)?;
            }

            if form.validate_current_step() {
                form.next_step();
            } else {
                println!("{}", "Fix the fields above to continue".yellow());
            }
        }

        if form.validate_form() {
            return Ok(());
        }
        print_form_errors(form);
        let first_invalid = PROTOCOL_FIELDS
            .iter()
            .find(|spec| form.validation_errors().contains_key(spec.name))
            .map(|spec| spec.step.index())
            .unwrap_or(0);
        form.go_to_step(first_invalid);
    }
}

fn prompt_field(form: &mut ProtocolForm, spec: &FieldSpec) -> Result<(), Box<dyn std::error::Error>> {
    let current = form.value(spec.name);
    let input = match spec.kind {
        FieldKind::Choice(options) => {
            let mut choices: Vec<&str> = vec![SKIP_CHOICE];
            choices.extend_from_slice(options);
            let start = choices.iter().position(|c| *c == current).unwrap_or(0);
            let picked = Select::new(&format!("{}:", spec.label), choices)
                .with_starting_cursor(start)
                .prompt()?;
            if picked == SKIP_CHOICE {
                String::new()
            } else {
                picked.to_string()
            }
        }
        FieldKind::Text | FieldKind::LongText | FieldKind::List | FieldKind::Number => {
            let is_list = spec.kind == FieldKind::List;
            // List entries are stored one per line but edited on one line
            let default = if is_list {
                current.replace('\n', "; ")
            } else {
                current.clone()
            };
            let label = format!("{}:", spec.label);
            let mut prompt = Text::new(&label).with_default(&default);
            if let Some(placeholder) = spec.placeholder {
                prompt = prompt.with_placeholder(placeholder);
            }
            if is_list {
                prompt = prompt.with_help_message("Separate entries with ';'");
            }
            answer_to_input(spec.kind, prompt.prompt()?)
        }
    };

    form.set_field(spec.name, &input);
    if !form.blur_field(spec.name) {
        if let Some(error) = form.field_error(spec.name) {
            println!("  {} {}", "✗".red(), error.red());
        }
    }
    Ok(())
}

/// List answers are typed on one line separated by `;`; everything else is
/// kept as typed
fn answer_to_input(kind: FieldKind, answer: String) -> String {
    match kind {
        FieldKind::List => answer
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => answer,
    }
}

fn print_form_errors(form: &ProtocolForm) {
    for spec in PROTOCOL_FIELDS {
        if let Some(error) = form.field_error(spec.name) {
            println!("  {} {}: {}", "✗".red(), spec.label, error.red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_answer_becomes_one_entry_per_line() {
        assert_eq!(
            answer_to_input(FieldKind::List, "Age 18-65; MDD diagnosis ;;".to_string()),
            "Age 18-65\nMDD diagnosis"
        );
    }

    #[test]
    fn test_free_text_answer_keeps_semicolons() {
        let answer = "Inhibits reuptake; modulates 5-HT1A".to_string();
        assert_eq!(answer_to_input(FieldKind::LongText, answer.clone()), answer);
        assert_eq!(answer_to_input(FieldKind::Text, "a;b".to_string()), "a;b");
    }

    #[test]
    fn test_completeness_text() {
        colored::control::set_override(false);
        assert_eq!(completeness_text(0.96), "96%");
        assert_eq!(completeness_text(1.4), "100%");
    }
}
