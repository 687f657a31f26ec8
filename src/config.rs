use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{TVConfig, TVError};
use crate::views::ViewKind;

pub const DEFAULT_CONFIG_PATH: &str = "~/.tvgrid/config.yml";

/// Browse the collections of a tvdaemon backend in the terminal.
#[derive(Debug, Default, Parser)]
#[command(version, about)]
pub struct Args {
    /// Backend base url, e.g. http://tv.local:7777/
    #[arg(short, long)]
    pub server: Option<String>,

    /// View to open first
    #[arg(long, value_enum)]
    pub view: Option<ViewKind>,

    /// Rows per page, overrides the per-view default
    #[arg(short, long)]
    pub page_size: Option<usize>,

    /// Request timeout in milliseconds
    #[arg(short, long)]
    pub timeout_ms: Option<u64>,

    /// Config file, defaults to ~/.tvgrid/config.yml
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log file
    #[arg(long)]
    pub log_file: Option<String>,

    /// Log filter, e.g. debug or tvgrid=trace
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: Option<String>,
    pub view: Option<ViewKind>,
    pub page_size: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub event_poll_time: Option<u64>,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
}

pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(path),
    }
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, TVError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            serde_yaml::from_str::<ConfigFile>(&contents).map_err(|source| TVError::ConfigParse {
                path: path.display().to_string(),
                source,
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TVError::ConfigNotFound(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Command line over config file over defaults.
pub fn merge(args: &Args, file: ConfigFile) -> Result<TVConfig, TVError> {
    let mut cfg = TVConfig::default();
    if let Some(server) = args.server.clone().or(file.server) {
        cfg = cfg.with_server(server);
    }
    if let Some(view) = args.view.or(file.view) {
        cfg = cfg.with_view(view);
    }
    if let Some(page_size) = args.page_size.or(file.page_size) {
        if page_size == 0 {
            return Err(TVError::InvalidPageSize);
        }
        cfg = cfg.with_page_size(page_size);
    }
    if let Some(timeout_ms) = args.timeout_ms.or(file.timeout_ms) {
        cfg = cfg.with_timeout_ms(timeout_ms);
    }
    if let Some(event_poll_time) = file.event_poll_time {
        cfg = cfg.with_event_poll_time(event_poll_time);
    }
    if let Some(log_file) = args.log_file.clone().or(file.log_file) {
        cfg = cfg.with_log_file(expand_path(&log_file).to_string_lossy().to_string());
    }
    if let Some(log_level) = args.log_level.clone().or(file.log_level) {
        cfg = cfg.with_log_level(log_level);
    }
    Ok(cfg)
}

/// Reads the config file named on the command line, or the default one if it
/// exists, and merges it with the arguments.
pub fn resolve(args: &Args) -> Result<TVConfig, TVError> {
    let (path, allow_missing) = match &args.config {
        Some(path) => (expand_path(path), false),
        None => (expand_path(DEFAULT_CONFIG_PATH), true),
    };
    let file = load_config(&path, allow_missing)?;
    debug!("Config file {}: {:?}", path.display(), file);
    merge(args, file)
}
