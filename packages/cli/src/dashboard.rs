// ABOUTME: Terminal rendering of a normalized analysis result
// ABOUTME: Score header, category table, findings, recommendations and historical comparisons

use std::fmt::Write;

use colored::*;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use trialguard_core::{AnalysisResult, Priority, RiskLevel, Severity};

const SUMMARY_WIDTH: usize = 88;

/// Render the full dashboard for one analysis
pub fn render_dashboard(result: &AnalysisResult) -> String {
    let mut out = String::new();
    render_header(&mut out, result);
    render_categories(&mut out, result);
    render_findings(&mut out, result);
    render_recommendations(&mut out, result);
    render_comparisons(&mut out, result);
    render_summary(&mut out, result);
    out
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", title.blue().bold());
}

pub fn risk_colored(level: RiskLevel, text: &str) -> ColoredString {
    match level {
        RiskLevel::Low => text.green(),
        RiskLevel::Moderate => text.yellow(),
        RiskLevel::High => text.red(),
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = severity.as_str().to_uppercase();
    match severity {
        Severity::Low => label.green(),
        Severity::Moderate => label.yellow(),
        Severity::High => label.red().bold(),
    }
}

fn priority_label(priority: Priority) -> String {
    match priority {
        Priority::High => "High",
        Priority::Medium => "Medium",
        Priority::Low => "Low",
    }
    .to_string()
}

/// `safety_alignment` -> `Safety Alignment`
pub fn humanize(key: &str) -> String {
    key.split(|c| c == '_' || c == '-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn render_header(out: &mut String, result: &AnalysisResult) {
    let level = result.risk_level();
    let _ = writeln!(out, "{}", "Protocol Risk Analysis".blue().bold());
    if let Some(id) = &result.analysis_id {
        let _ = writeln!(out, "{}", format!("Analysis {}", id).dimmed());
    }
    let _ = writeln!(out);
    let score = format!("{:.0}/100", result.overall_score);
    let _ = writeln!(
        out,
        "Overall risk score: {}  {}",
        risk_colored(level, &score).bold(),
        risk_colored(level, &format!("{} RISK", level.as_str().to_uppercase())).bold()
    );
    let _ = writeln!(out, "Confidence: {:.0}%", result.confidence * 100.0);

    let high = result.findings_with_severity(Severity::High).count();
    let moderate = result.findings_with_severity(Severity::Moderate).count();
    let low = result.findings_with_severity(Severity::Low).count();
    let _ = writeln!(
        out,
        "Findings: {} high, {} moderate, {} low",
        high.to_string().red(),
        moderate.to_string().yellow(),
        low.to_string().green()
    );
    if let Some(seconds) = result.processing_time_seconds {
        let _ = writeln!(out, "{}", format!("Processed in {:.1}s", seconds).dimmed());
    }
}

fn render_categories(out: &mut String, result: &AnalysisResult) {
    section(out, "Risk Categories");
    if result.categories.is_empty() {
        let _ = writeln!(out, "{}", "No category scores reported".dimmed());
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Category", "Score", "Level", "Findings"]);
    for (name, breakdown) in &result.categories {
        let level = RiskLevel::from_score(breakdown.score);
        table.add_row(vec![
            humanize(name),
            format!("{:.0}", breakdown.score),
            level.as_str().to_string(),
            breakdown.findings.len().to_string(),
        ]);
    }
    let _ = writeln!(out, "{}", table);
}

fn render_findings(out: &mut String, result: &AnalysisResult) {
    section(out, "Findings");
    if result.findings.is_empty() {
        let _ = writeln!(out, "{}", "No findings".dimmed());
        return;
    }

    for severity in [Severity::High, Severity::Moderate, Severity::Low] {
        for finding in result.findings_with_severity(severity) {
            let category = if finding.category.is_empty() {
                String::new()
            } else {
                format!(" ({})", humanize(&finding.category))
            };
            let _ = writeln!(
                out,
                "[{}] {}{}",
                severity_label(severity),
                finding.title.bold(),
                category.dimmed()
            );
            if !finding.description.is_empty() {
                let _ = writeln!(out, "    {}", finding.description);
            }
            if let Some(impact) = &finding.quantified_impact {
                let _ = writeln!(out, "    Impact: {}", impact);
            }
            if let Some(recommendation) = &finding.recommendation {
                let _ = writeln!(out, "    {} {}", "->".cyan(), recommendation);
            }
        }
    }
}

fn render_recommendations(out: &mut String, result: &AnalysisResult) {
    section(out, "Recommendations");
    let recommendations = result.prioritized_recommendations();
    if recommendations.is_empty() {
        let _ = writeln!(out, "{}", "No recommendations".dimmed());
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Priority", "Recommendation", "Category", "Risk Reduction", "Difficulty"]);
    for rec in recommendations {
        table.add_row(vec![
            priority_label(rec.priority),
            rec.title.clone(),
            humanize(&rec.category),
            rec.expected_risk_reduction
                .map(|r| format!("-{:.0}", r))
                .unwrap_or_else(|| "-".to_string()),
            rec.difficulty.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    let _ = writeln!(out, "{}", table);
}

fn render_comparisons(out: &mut String, result: &AnalysisResult) {
    section(out, "Similar Historical Trials");
    if result.comparisons.is_empty() {
        let _ = writeln!(out, "{}", "No comparable trials found".dimmed());
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["NCT ID", "Trial", "Phase", "Outcome", "Similarity", "Failure Reasons"]);
    for trial in &result.comparisons {
        table.add_row(vec![
            trial.nct_id.clone(),
            trial.trial_name.clone(),
            trial.phase.clone(),
            trial.outcome.clone(),
            format!("{:.0}", trial.comparable_risk_score),
            trial.failure_reasons.join("; "),
        ]);
    }
    let _ = writeln!(out, "{}", table);
}

fn render_summary(out: &mut String, result: &AnalysisResult) {
    if result.executive_summary.trim().is_empty() {
        return;
    }
    section(out, "Executive Summary");
    for line in wrap(&result.executive_summary, SUMMARY_WIDTH) {
        let _ = writeln!(out, "{}", line);
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}
