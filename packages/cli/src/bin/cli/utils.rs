use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use trialguard_ai::{ClientConfig, TrialGuardClient};

/// Build a client from `TRIALGUARD_*` environment variables
pub fn client_from_env() -> Result<TrialGuardClient, Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    tracing::debug!("Using TrialGuard backend at {}", config.base_url);
    Ok(TrialGuardClient::new(config)?)
}

pub fn spinner(message: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

pub fn progress_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn or_dash(s: &str) -> String {
    if s.trim().is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer trial name", 10), "a much ...");
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash("  "), "-");
        assert_eq!(or_dash("Phase 3"), "Phase 3");
    }
}
