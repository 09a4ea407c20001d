use super::args::*;
use promptle_core::config::{load_config, GameConfig};
use std::path::{Path, PathBuf};

pub mod challenge;
pub mod history;
pub mod init;
pub mod submit;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const ATTEMPT_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

const DEFAULT_CONFIG: &str = "promptle.yaml";

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    if let Command::Version = cli.cmd {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(exit_codes::OK);
    }

    if let Command::Init = cli.cmd {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
        init::write_sample_config_if_missing(&path)?;
    }

    let cfg = match resolve_config(cli.config.as_deref(), cli.strict) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    crate::init_logging(&cfg.log_level);

    match cli.cmd {
        Command::Init => init::run(&cfg).await,
        Command::Challenge(args) => match args.cmd {
            ChallengeSub::Add(a) => challenge::add(&cfg, a).await,
            ChallengeSub::Today(a) => challenge::today(&cfg, a).await,
        },
        Command::Submit(args) => submit::run(&cfg, args).await,
        Command::Attempts(args) => history::attempts(&cfg, args).await,
        Command::Best(args) => history::best(&cfg, args).await,
        Command::Version => Ok(exit_codes::OK),
    }
}

/// File (explicit path, or ./promptle.yaml when present, or built-in
/// defaults), then environment overrides.
fn resolve_config(explicit: Option<&Path>, strict: bool) -> anyhow::Result<GameConfig> {
    let mut cfg = match explicit {
        Some(path) => load_config(path, strict)?,
        None if Path::new(DEFAULT_CONFIG).exists() => load_config(Path::new(DEFAULT_CONFIG), strict)?,
        None => GameConfig::default(),
    };
    cfg.apply_env()?;
    Ok(cfg)
}

/// Orchestrator over the configured store; config problems become exit code 2.
pub(crate) fn orchestrator(
    cfg: &GameConfig,
) -> Result<promptle_core::engine::AttemptOrchestrator, i32> {
    let built = promptle_core::bootstrap::open_store(cfg)
        .and_then(|store| promptle_core::bootstrap::build_orchestrator(cfg, store));
    built.map_err(|e| {
        eprintln!("{}", e);
        exit_codes::CONFIG_ERROR
    })
}
