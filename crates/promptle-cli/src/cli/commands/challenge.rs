use super::exit_codes;
use crate::cli::args::{ChallengeAddArgs, OutputFormat, TodayArgs};
use chrono::Utc;
use promptle_core::config::GameConfig;
use promptle_core::model::{Challenge, NewChallenge};
use promptle_core::storage::ChallengeStore;
use promptle_core::timeouts::bounded;

pub async fn add(cfg: &GameConfig, args: ChallengeAddArgs) -> anyhow::Result<i32> {
    if args.id.trim().is_empty() || args.image_url.trim().is_empty() {
        eprintln!("config error: --id and --image-url must not be empty");
        return Ok(exit_codes::CONFIG_ERROR);
    }
    let store = promptle_core::bootstrap::open_store(cfg)?;
    let new = NewChallenge {
        id: args.id,
        date: args.date.unwrap_or_else(|| Utc::now().date_naive()),
        image_url: args.image_url,
        photographer_name: args.photographer_name,
        photographer_url: args.photographer_url,
    };
    let created = store.insert_challenge(&new).await?;
    println!("scheduled {} for {}", created.id, created.date);
    Ok(exit_codes::OK)
}

pub async fn today(cfg: &GameConfig, args: TodayArgs) -> anyhow::Result<i32> {
    let store = promptle_core::bootstrap::open_store(cfg)?;
    let date = Utc::now().date_naive();
    let found = bounded(
        cfg.timeouts.storage(),
        "challenge_by_date",
        store.challenge_for_date(date),
    )
    .await?;
    let Some(challenge) = found else {
        eprintln!("no challenge scheduled for {}", date);
        return Ok(exit_codes::ATTEMPT_FAILED);
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&public(challenge))?),
        OutputFormat::Text => {
            println!("{}  {}", challenge.id, challenge.date);
            println!("image: {}", challenge.image_url);
            if let Some(name) = &challenge.photographer_name {
                match &challenge.photographer_url {
                    Some(url) => println!("photo by {} ({})", name, url),
                    None => println!("photo by {}", name),
                }
            }
        }
    }
    Ok(exit_codes::OK)
}

/// Players never see the target embedding.
fn public(mut challenge: Challenge) -> Challenge {
    challenge.embedding = None;
    challenge
}
