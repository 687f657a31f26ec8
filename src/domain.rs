use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::views::ViewKind;

pub const HELP_TEXT: &str = "\
tvgrid - browse a tvdaemon backend

Navigation
  Up / k, Down / j      move the row selection
  PageUp / [            previous page
  PageDown / ]          next page
  Enter                 activate the selected row
  u                     update the selected row (channels: refresh its EPG)
  /                     focus the search box (Enter leaves it, Esc clears it)
  Tab / Shift-Tab       next / previous view
  1 .. 8                jump to a view
  r                     reload the current page

Other
  ?                     this help
  Esc                   close popups, decline a prompt
  y                     accept a prompt
  q                     quit
";

#[derive(Debug, Error)]
pub enum TVError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("http client error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("failed to parse config '{path}': {source}")]
    ConfigParse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config file not found '{0}'")]
    ConfigNotFound(String),
    #[error("invalid server url '{0}'")]
    InvalidServerUrl(String),
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(prefix = "with_")]
pub struct TVConfig {
    pub server: String,
    pub timeout_ms: u64,
    #[setters(strip_option)]
    pub page_size: Option<usize>,
    pub view: ViewKind,
    pub event_poll_time: u64,
    pub log_file: String,
    pub log_level: String,
}

impl Default for TVConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:7777/".to_string(),
            timeout_ms: 3000,
            page_size: None,
            view: ViewKind::Channels,
            event_poll_time: 100,
            log_file: "tvgrid.log".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    ScrollPrev,
    ScrollNext,
    Enter,
    Update,
    Exit,
    Accept,
    Help,
    Search,
    Reload,
    NextView,
    PrevView,
    SelectView(usize),
    Resize(usize, usize),
    RawKey(KeyEvent),
}

/// What a host view asks the application to do after a row was activated.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the user first, run `then` only when accepted.
    Confirm { prompt: String, then: Box<Command> },
    /// One-off backend call. Failures are surfaced to the user.
    Call { url: String, after: AfterCall },
    /// Put text on the clipboard.
    Copy(String),
    /// Tell the user something on the status line.
    Status(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterCall {
    Nothing,
    Reload,
}
