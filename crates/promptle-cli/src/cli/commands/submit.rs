use super::exit_codes;
use crate::cli::args::{OutputFormat, SubmitArgs};
use promptle_core::config::GameConfig;
use promptle_core::model::{Outcome, MAX_ATTEMPTS};

pub async fn run(cfg: &GameConfig, args: SubmitArgs) -> anyhow::Result<i32> {
    let orch = match super::orchestrator(cfg) {
        Ok(o) => o,
        Err(code) => return Ok(code),
    };
    let outcome = orch
        .submit_attempt(args.user.as_deref(), &args.challenge, &args.prompt)
        .await;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_text(&outcome),
    }
    Ok(exit_code(&outcome))
}

fn print_text(outcome: &Outcome) {
    match outcome {
        Outcome::Success(s) => {
            println!(
                "score: {}/100 (attempt {} of {})",
                s.score, s.attempt_number, MAX_ATTEMPTS
            );
            if let Some(url) = &s.image_url {
                println!("image: {}", url);
            }
            println!("{}", s.message);
        }
        Outcome::Failure(f) if f.kind.is_informational() => println!("{}", f.message),
        Outcome::Failure(f) => {
            println!("{} ({})", f.message, f.kind);
            if let Some(url) = &f.image_url {
                println!("image: {}", url);
            }
        }
    }
}

/// Running out of attempts is not an error.
fn exit_code(outcome: &Outcome) -> i32 {
    match outcome.failure_kind() {
        None => exit_codes::OK,
        Some(kind) if kind.is_informational() => exit_codes::OK,
        Some(_) => exit_codes::ATTEMPT_FAILED,
    }
}
