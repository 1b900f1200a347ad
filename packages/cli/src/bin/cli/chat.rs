use colored::*;
use inquire::{InquireError, Text};
use trialguard_ai::{ChatSession, ClientError};

use super::utils::{client_from_env, spinner};

pub async fn run_chat(analysis_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;

    let pb = spinner("Loading analysis...")?;
    let result = client.saved_analysis(analysis_id).await;
    pb.finish_and_clear();
    let result = result?;

    let level = result.risk_level();
    println!(
        "{} {} {}",
        "Chatting about analysis".blue().bold(),
        analysis_id.cyan(),
        trialguard_cli::dashboard::risk_colored(
            level,
            &format!("({:.0}/100, {} risk)", result.overall_score, level)
        )
    );
    println!(
        "{}",
        "Type a question. '/reset' clears the conversation, 'exit' quits, Ctrl-C cancels a pending reply."
            .dimmed()
    );

    let context = result.to_context();
    let mut session = ChatSession::new();
    tracing::debug!(session = %session.id(), "Chat session started");

    loop {
        println!();
        let line = match Text::new("You:").prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                session.reset();
                println!("{}", "Conversation cleared".dimmed());
                continue;
            }
            _ => {}
        }

        let cancel = session.cancel_handle();
        let pb = spinner("Thinking...")?;
        let send = session.send(&client, line, &context);
        tokio::pin!(send);
        let finished = tokio::select! {
            outcome = &mut send => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        let outcome = match finished {
            Some(outcome) => outcome,
            None => {
                cancel.cancel();
                send.await
            }
        };
        pb.finish_and_clear();

        match outcome {
            Ok(reply) => println!("{} {}", "Assistant:".green().bold(), reply),
            Err(ClientError::Cancelled) => println!("{}", "Request cancelled".yellow()),
            Err(e) => println!("{} {}", "Error:".red().bold(), e),
        }
    }

    println!("{}", format!("{} messages exchanged", session.messages().len()).dimmed());
    Ok(())
}
