use std::env;
use std::path::PathBuf;

use gridfall_engine::{resolve_app_paths, LoopConfig, SceneFactory, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::level::{load_campaign, CampaignFactory, LevelLoadError, SceneOptions};

const DEMO_ENV_VAR: &str = "GRIDFALL_DEMO";
const REALTIME_ENV_VAR: &str = "GRIDFALL_REALTIME";
const RECORD_ENV_VAR: &str = "GRIDFALL_RECORD";
const MAX_TICKS_ENV_VAR: &str = "GRIDFALL_MAX_TICKS";
const GOD_MODE_ENV_VAR: &str = "GRIDFALL_GOD_MODE";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) factory: Box<dyn SceneFactory>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Levels(#[from] LevelLoadError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Gridfall Startup ===");

    let paths = resolve_app_paths()?;
    let levels = load_campaign(&paths.levels_dir)?;
    let options = scene_options(
        env::var(DEMO_ENV_VAR).ok().as_deref(),
        env::var(RECORD_ENV_VAR).ok().as_deref(),
        env::var(GOD_MODE_ENV_VAR).ok().as_deref(),
    );
    let config = LoopConfig {
        realtime: parse_flag(env::var(REALTIME_ENV_VAR).ok().as_deref(), true),
        max_ticks: parse_max_ticks(env::var(MAX_TICKS_ENV_VAR).ok().as_deref()),
        ..LoopConfig::default()
    };
    info!(
        root = %paths.root.display(),
        levels = levels.len(),
        demo = options.demo,
        god_mode = options.god_mode,
        record_dir = ?options.record_dir,
        realtime = config.realtime,
        max_ticks = ?config.max_ticks,
        "campaign_loaded"
    );

    Ok(AppWiring {
        config,
        factory: Box::new(CampaignFactory::new(levels, options)),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn scene_options(demo: Option<&str>, record: Option<&str>, god_mode: Option<&str>) -> SceneOptions {
    SceneOptions {
        demo: parse_flag(demo, false),
        record_dir: parse_record_dir(record),
        god_mode: parse_flag(god_mode, false),
    }
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim) {
        Some("1") | Some("true") | Some("on") | Some("yes") => true,
        Some("0") | Some("false") | Some("off") | Some("no") => false,
        _ => default,
    }
}

fn parse_record_dir(raw: Option<&str>) -> Option<PathBuf> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn parse_max_ticks(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|ticks| *ticks > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_fall_back_to_their_default() {
        assert!(parse_flag(None, true));
        assert!(!parse_flag(None, false));
        assert!(parse_flag(Some(" on "), false));
        assert!(!parse_flag(Some("0"), true));
        assert!(parse_flag(Some("maybe"), true));
    }

    #[test]
    fn scene_options_read_demo_record_and_god_mode() {
        let options = scene_options(Some("1"), Some("records"), Some("on"));
        assert!(options.demo);
        assert!(options.god_mode);
        assert_eq!(options.record_dir, Some(PathBuf::from("records")));

        let defaults = scene_options(None, None, None);
        assert!(!defaults.demo);
        assert!(!defaults.god_mode);
        assert_eq!(defaults.record_dir, None);
    }

    #[test]
    fn record_dir_ignores_blank_values() {
        assert_eq!(parse_record_dir(Some("  ")), None);
        assert_eq!(
            parse_record_dir(Some("records")),
            Some(PathBuf::from("records"))
        );
    }

    #[test]
    fn max_ticks_requires_a_positive_integer() {
        assert_eq!(parse_max_ticks(Some("600")), Some(600));
        assert_eq!(parse_max_ticks(Some("0")), None);
        assert_eq!(parse_max_ticks(Some("-3")), None);
        assert_eq!(parse_max_ticks(None), None);
    }
}
