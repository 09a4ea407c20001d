use super::exit_codes;
use promptle_core::config::GameConfig;
use std::path::Path;

pub(crate) fn write_sample_config_if_missing(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        eprintln!("note: {} already exists", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    promptle_core::config::write_sample_config(path)?;
    eprintln!("created {}", path.display());
    Ok(())
}

pub async fn run(cfg: &GameConfig) -> anyhow::Result<i32> {
    let store = promptle_core::bootstrap::open_store(cfg)?;
    let stats = store.stats()?;
    tracing::info!(
        event = "promptle.init",
        db = %cfg.db.display(),
        challenges = stats.challenges,
        guesses = stats.guesses
    );
    println!(
        "database ready at {} ({} challenges, {} guesses)",
        cfg.db.display(),
        stats.challenges,
        stats.guesses
    );
    Ok(exit_codes::OK)
}
