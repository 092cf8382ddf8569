use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use typer_engine::webdriver::Browser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowserArg {
    Chrome,
    Firefox,
}

impl From<BrowserArg> for Browser {
    fn from(arg: BrowserArg) -> Self {
        match arg {
            BrowserArg::Chrome => Browser::Chrome,
            BrowserArg::Firefox => Browser::Firefox,
        }
    }
}

/// Type the contents of text files into a rich-text editor on a web page.
///
/// Progress is checkpointed per URL, so an interrupted run picks up where it
/// stopped.
#[derive(Debug, Clone, Parser)]
#[command(name = "tinytyper", version, about)]
pub struct Cli {
    /// Page that hosts the editor.
    pub url: String,

    /// Text file to type (optional when --files is given).
    pub file: Option<PathBuf>,

    /// Files to type in order. When given, FILE is ignored.
    #[arg(long, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Inserted between consecutive files.
    #[arg(long, default_value = "\n\n")]
    pub file_separator: String,

    #[arg(long, value_enum)]
    pub browser: Option<BrowserArg>,

    /// Browser profile directory.
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Attach to a browser that is already running.
    #[arg(long)]
    pub use_existing: bool,

    /// Chrome remote debugging port used with --use-existing.
    #[arg(long)]
    pub debugging_port: Option<u16>,

    /// Firefox marionette port used with --use-existing.
    #[arg(long)]
    pub marionette_port: Option<u16>,

    /// Navigate to URL even when attached to an existing browser.
    #[arg(long)]
    pub force_navigation: bool,

    /// WebDriver endpoint (chromedriver or geckodriver).
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Id of an iframe to enter before looking for the editor.
    #[arg(long)]
    pub iframe_id: Option<String>,

    /// Id of the editor element.
    #[arg(long)]
    pub editor_id: Option<String>,

    /// List every editor on the page and ask which one to use.
    #[arg(long)]
    pub detect_multiple: bool,

    /// Seconds between characters in char-by-char mode.
    #[arg(long)]
    pub type_delay: Option<f64>,

    /// Treat HTML input as markup instead of literal text.
    #[arg(long)]
    pub formatted: bool,

    /// Skip the clipboard paste attempt.
    #[arg(long)]
    pub no_clipboard: bool,

    /// Fall back to chunked typing instead of char-by-char.
    #[arg(long)]
    pub batch: bool,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Seconds between chunks in batch mode.
    #[arg(long)]
    pub batch_delay: Option<f64>,

    /// Neither load nor save progress.
    #[arg(long)]
    pub no_session: bool,

    /// Discard saved progress for this URL and start from the beginning.
    #[arg(long)]
    pub reset: bool,

    /// Encrypt the session record with a password.
    #[arg(long)]
    pub encrypt: bool,

    #[arg(long)]
    pub session_dir: Option<PathBuf>,

    /// Do not read the editor back after typing.
    #[arg(long)]
    pub no_verification: bool,

    /// RON configuration file (default: ./tinytyper.ron when present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, short)]
    pub verbose: bool,

    /// Answer yes to the resume and page-ready prompts.
    #[arg(long, short)]
    pub yes: bool,
}

impl Cli {
    /// `--files` when given, otherwise FILE.
    pub fn input_files(&self) -> Vec<PathBuf> {
        if !self.files.is_empty() {
            return self.files.clone();
        }
        self.file.iter().cloned().collect()
    }
}
