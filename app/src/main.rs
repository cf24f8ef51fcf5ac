use std::fs::OpenOptions;
use std::sync::Mutex;

use querydeck_core::config::{default_config_dir, AppConfig, FileConfigStore, LOG_FILTER_ENV};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "querydeck.log";

fn run_app(
    config: AppConfig,
    run_tui: impl FnOnce(AppConfig) -> Result<(), querydeck_tui::TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        base_url = %config.base_url,
        demo_mode = config.demo_mode,
        history_capacity = config.history_capacity,
        "starting querydeck"
    );
    run_tui(config)?;
    tracing::info!("querydeck exited");
    Ok(())
}

fn apply_cli_flags(config: &mut AppConfig, args: impl IntoIterator<Item = String>) {
    for arg in args {
        if arg == "--demo" {
            config.demo_mode = true;
        }
    }
}

fn init_file_logging(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let dir = default_config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))?;

    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = FileConfigStore::load_default()?;
    let mut config = store.config().clone();
    config.apply_env_overrides();
    apply_cli_flags(&mut config, std::env::args().skip(1));
    init_file_logging(&config)?;
    tracing::info!(path = %store.path().display(), "loaded config");
    run_app(config, querydeck_tui::run)
}

#[cfg(test)]
mod tests {
    use std::io;

    use querydeck_core::config::AppConfig;

    use super::{apply_cli_flags, run_app};

    #[test]
    fn run_app_hands_config_to_tui_runner() {
        let config = AppConfig {
            base_url: "http://api.internal:8080".to_string(),
            ..AppConfig::default()
        };
        let result = run_app(config, |config| {
            assert_eq!(config.base_url, "http://api.internal:8080");
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn run_app_propagates_tui_errors() {
        let result = run_app(AppConfig::default(), |_| {
            Err(querydeck_tui::TuiError::Io(io::Error::other("boom")))
        });
        assert!(result.is_err());
    }

    #[test]
    fn demo_flag_enables_demo_mode() {
        let mut config = AppConfig::default();
        apply_cli_flags(&mut config, vec!["--verbose".to_string()]);
        assert!(!config.demo_mode);

        apply_cli_flags(&mut config, vec!["--demo".to_string()]);
        assert!(config.demo_mode);
    }
}
