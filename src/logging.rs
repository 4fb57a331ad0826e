use crate::util::parse_bool_str;
use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_PATH: &str = "/tmp/wschat.log";
const LOG_PATH_ENV: &str = "WSCHAT_LOG_PATH";
const LOG_FILTER_ENV: &str = "WSCHAT_LOG";
const LOG_STDERR_ENV: &str = "WSCHAT_LOG_STDERR";
const DEFAULT_FILTER: &str = "info";

/// Installs the global tracing subscriber.
///
/// The TUI owns the terminal, so logs go to a file whenever stderr is a
/// terminal. Otherwise (pipes, CI) they go to stderr.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false);

    let installed = match resolve_log_path() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {path}"))?;
            builder.with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

fn resolve_log_path() -> Option<String> {
    let forced_stderr = std::env::var(LOG_STDERR_ENV)
        .ok()
        .and_then(|v| parse_bool_str(&v))
        .unwrap_or(false);
    if forced_stderr {
        return None;
    }

    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}
