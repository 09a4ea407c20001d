use super::exit_codes;
use crate::cli::args::{HistoryArgs, OutputFormat};
use promptle_core::config::GameConfig;
use promptle_core::ledger::GuessLedger;
use promptle_core::model::MAX_ATTEMPTS;
use std::sync::Arc;

/// Read-only view of the ledger; needs no embedder or generator.
fn ledger(cfg: &GameConfig) -> anyhow::Result<GuessLedger> {
    let store = promptle_core::bootstrap::open_store(cfg)?;
    Ok(GuessLedger::new(Arc::new(store), cfg.timeouts))
}

pub async fn attempts(cfg: &GameConfig, args: HistoryArgs) -> anyhow::Result<i32> {
    let guesses = ledger(cfg)?
        .list_by_user(&args.user, &args.challenge)
        .await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&guesses)?),
        OutputFormat::Text => {
            if guesses.is_empty() {
                println!("no attempts yet ({} remaining)", MAX_ATTEMPTS);
            }
            for g in &guesses {
                println!(
                    "#{}  {:>3}  {}  {}",
                    g.attempt_number,
                    g.score,
                    g.created_at.format("%H:%M:%S"),
                    g.prompt
                );
            }
        }
    }
    Ok(exit_codes::OK)
}

pub async fn best(cfg: &GameConfig, args: HistoryArgs) -> anyhow::Result<i32> {
    let best = ledger(cfg)?.best_score(&args.user, &args.challenge).await?;

    match (args.format, best) {
        (OutputFormat::Json, b) => println!("{}", serde_json::json!({ "best_score": b })),
        (OutputFormat::Text, Some(score)) => println!("best score: {}", score),
        (OutputFormat::Text, None) => println!("no attempts yet"),
    }
    Ok(exit_codes::OK)
}
