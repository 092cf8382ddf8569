//! Run settings: an optional RON file provides defaults, command-line flags
//! override them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use typer_core::FallbackPolicy;
use typer_engine::webdriver::{Browser, BrowserOptions, ClientSettings, EditorSettings};
use typer_engine::{
    EditorQuery, RunSettings, StrategyConfigError, StrategySettings, DEFAULT_BATCH_DELAY,
    DEFAULT_BATCH_SIZE, DEFAULT_TYPE_DELAY,
};
use typer_logging::{typer_info, typer_warn};

use crate::cli::Cli;

pub const DEFAULT_CONFIG_FILE: &str = "tinytyper.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("no input file given (pass FILE or --files)")]
    NoInput,
    #[error("{0} must be a positive number of seconds")]
    InvalidTimeout(&'static str),
    #[error("unknown browser {0:?} in config")]
    UnknownBrowser(String),
    #[error(transparent)]
    Strategy(#[from] StrategyConfigError),
}

/// Contents of `tinytyper.ron`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub webdriver_url: Option<String>,
    pub browser: Option<String>,
    pub type_delay_secs: Option<f64>,
    pub batch_size: Option<usize>,
    pub batch_delay_secs: Option<f64>,
    pub session_dir: Option<PathBuf>,
    pub locate_timeout_secs: Option<f64>,
    pub request_timeout_secs: Option<f64>,
}

impl FileConfig {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Read `explicit`, or `./tinytyper.ron` when no path was given. Only the
    /// implicit file may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if explicit.is_none() && err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let config = Self::parse(&path, &text)?;
        typer_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub enabled: bool,
    pub reset: bool,
    pub encrypt: bool,
    pub dir: PathBuf,
}

/// Everything a run needs, after merging the config file with the flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub files: Vec<PathBuf>,
    pub separator: String,
    pub editor: EditorSettings,
    pub query: EditorQuery,
    pub force_navigation: bool,
    pub run: RunSettings,
    pub session: SessionOptions,
    pub assume_yes: bool,
}

impl Settings {
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Result<Self, ConfigError> {
        let files = cli.input_files();
        if files.is_empty() {
            return Err(ConfigError::NoInput);
        }
        if let (Some(file), false) = (&cli.file, cli.files.is_empty()) {
            typer_warn!("Ignoring {} because --files was given", file.display());
        }

        let browser = match (cli.browser, &file.browser) {
            (Some(arg), _) => arg.into(),
            (None, Some(name)) => {
                Browser::parse(name).ok_or_else(|| ConfigError::UnknownBrowser(name.clone()))?
            }
            (None, None) => Browser::default(),
        };
        let mut client = ClientSettings {
            base_url: cli
                .webdriver_url
                .clone()
                .or_else(|| file.webdriver_url.clone())
                .unwrap_or_else(|| browser.default_webdriver_url().to_string()),
            ..ClientSettings::default()
        };
        if let Some(secs) = file.request_timeout_secs {
            client.request_timeout = positive_secs(secs, "request_timeout_secs")?;
        }

        let mut editor = EditorSettings {
            client,
            browser: BrowserOptions {
                browser,
                profile: cli.profile.clone(),
                use_existing: cli.use_existing,
                debugging_port: cli
                    .debugging_port
                    .unwrap_or(BrowserOptions::default().debugging_port),
                marionette_port: cli.marionette_port,
            },
            formatted: cli.formatted,
            ..EditorSettings::default()
        };
        if let Some(secs) = file.locate_timeout_secs {
            editor.locate_timeout = positive_secs(secs, "locate_timeout_secs")?;
        }

        let strategies = StrategySettings::from_operator(
            cli.batch_size.or(file.batch_size).unwrap_or(DEFAULT_BATCH_SIZE),
            cli.batch_delay
                .or(file.batch_delay_secs)
                .unwrap_or(DEFAULT_BATCH_DELAY.as_secs_f64()),
            cli.type_delay
                .or(file.type_delay_secs)
                .unwrap_or(DEFAULT_TYPE_DELAY.as_secs_f64()),
        )?;
        let run = RunSettings {
            policy: FallbackPolicy {
                clipboard_enabled: !cli.no_clipboard,
                prefer_batch: cli.batch,
            },
            strategies,
            verify: !cli.no_verification,
            formatted: cli.formatted,
        };

        let session = SessionOptions {
            enabled: !cli.no_session,
            reset: cli.reset,
            encrypt: cli.encrypt,
            dir: cli
                .session_dir
                .clone()
                .or_else(|| file.session_dir.clone())
                .unwrap_or_else(default_session_dir),
        };

        Ok(Self {
            url: cli.url.clone(),
            files,
            separator: cli.file_separator.clone(),
            editor,
            query: EditorQuery {
                iframe_id: cli.iframe_id.clone(),
                editor_id: cli.editor_id.clone(),
                detect_multiple: cli.detect_multiple,
            },
            force_navigation: cli.force_navigation,
            run,
            session,
            assume_yes: cli.yes,
        })
    }
}

fn positive_secs(secs: f64, field: &'static str) -> Result<Duration, ConfigError> {
    if secs <= 0.0 {
        return Err(ConfigError::InvalidTimeout(field));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidTimeout(field))
}

/// `<local data dir>/tinytyper/sessions`, or `./.tinytyper` when the platform
/// has no data directory.
pub fn default_session_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("tinytyper").join("sessions"))
        .unwrap_or_else(|| PathBuf::from(".tinytyper"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["tinytyper", "https://example.com/edit"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn defaults_without_config() {
        let settings = Settings::resolve(&cli(&["doc.txt"]), &FileConfig::default()).unwrap();

        assert_eq!(settings.editor.browser.browser, Browser::Chrome);
        assert_eq!(settings.editor.client.base_url, "http://localhost:9515");
        assert_eq!(settings.editor.browser.debugging_port, 9222);
        assert_eq!(settings.run.strategies, StrategySettings::default());
        assert!(settings.run.policy.clipboard_enabled);
        assert!(!settings.run.policy.prefer_batch);
        assert!(settings.run.verify);
        assert!(settings.session.enabled);
        assert_eq!(settings.session.dir, default_session_dir());
    }

    #[test]
    fn firefox_gets_geckodriver_port() {
        let settings =
            Settings::resolve(&cli(&["doc.txt", "--browser", "firefox"]), &FileConfig::default())
                .unwrap();
        assert_eq!(settings.editor.client.base_url, "http://localhost:4444");
    }

    #[test]
    fn flags_override_config_file() {
        let file = FileConfig::parse(
            Path::new("tinytyper.ron"),
            r#"(
                browser: Some("firefox"),
                batch_size: Some(10),
                batch_delay_secs: Some(0.5),
                session_dir: Some("/tmp/sessions"),
                locate_timeout_secs: Some(3.0),
            )"#,
        )
        .unwrap();

        let settings =
            Settings::resolve(&cli(&["doc.txt", "--batch-size", "25", "--browser", "chrome"]), &file)
                .unwrap();

        assert_eq!(settings.editor.browser.browser, Browser::Chrome);
        assert_eq!(settings.run.strategies.batch_size.get(), 25);
        assert_eq!(settings.run.strategies.batch_delay, Duration::from_millis(500));
        assert_eq!(settings.session.dir, PathBuf::from("/tmp/sessions"));
        assert_eq!(settings.editor.locate_timeout, Duration::from_secs(3));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Settings::resolve(&cli(&[]), &FileConfig::default()),
            Err(ConfigError::NoInput)
        ));
        assert!(matches!(
            Settings::resolve(&cli(&["doc.txt", "--batch-size", "0"]), &FileConfig::default()),
            Err(ConfigError::Strategy(StrategyConfigError::ZeroBatchSize))
        ));
        let file = FileConfig {
            browser: Some("netscape".into()),
            ..FileConfig::default()
        };
        assert!(matches!(
            Settings::resolve(&cli(&["doc.txt"]), &file),
            Err(ConfigError::UnknownBrowser(_))
        ));
        let file = FileConfig {
            request_timeout_secs: Some(0.0),
            ..FileConfig::default()
        };
        assert!(matches!(
            Settings::resolve(&cli(&["doc.txt"]), &file),
            Err(ConfigError::InvalidTimeout("request_timeout_secs"))
        ));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.ron");
        fs::write(&path, "(batch_size: \"lots\")").unwrap();

        let err = FileConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("custom.ron"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let temp = TempDir::new().unwrap();
        let err = FileConfig::load(Some(&temp.path().join("missing.ron"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
