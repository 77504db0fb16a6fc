// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command line and derived daemon configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use logcrunch_adapters::WsConfig;
use logcrunch_core::IdShape;
use logcrunch_engine::{FlusherConfig, SupervisorConfig};

use crate::lifecycle::LifecycleError;

/// Overrides every other state directory source except `--state-dir`
pub const STATE_DIR_ENV: &str = "LOGCRUNCH_STATE_DIR";

#[derive(Debug, Parser)]
#[command(
    name = "logcrunchd",
    version,
    about = "logcrunch daemon - ingest structured logs from a websocket producer"
)]
pub struct Cli {
    /// Producer endpoint (ws:// or wss://), remembered for later runs
    #[arg(long)]
    pub source: Option<String>,

    /// State directory [default: $LOGCRUNCH_STATE_DIR, $XDG_STATE_HOME/logcrunch or ~/.local/state/logcrunch]
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Print newly received records to stdout
    #[arg(long)]
    pub tail: bool,

    /// Milliseconds between persistence flushes
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub flush_interval: u64,

    /// Milliseconds to wait before reconnecting after a failure
    #[arg(long, default_value_t = 3000)]
    pub reconnect_delay: u64,

    /// Record identity shape to accept (sniff, opaque, structured)
    #[arg(long, default_value_t = IdShape::Sniff)]
    pub id_shape: IdShape,
}

impl Cli {
    /// Resolve paths against the process environment
    pub fn into_config(self) -> Result<Config, LifecycleError> {
        let state_dir = resolve_state_dir(self.state_dir.clone(), |key| std::env::var(key).ok())?;
        Ok(self.with_state_dir(state_dir))
    }

    fn with_state_dir(self, state_dir: PathBuf) -> Config {
        let mut config = Config::for_state_dir(state_dir);
        config.source = self.source;
        config.tail = self.tail;
        config.id_shape = self.id_shape;
        config.flusher.interval = Duration::from_millis(self.flush_interval);
        config.supervisor.reconnect_delay = Duration::from_millis(self.reconnect_delay);
        config
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    /// Key/value store (endpoint URL, persisted records)
    pub store_path: PathBuf,
    pub log_path: PathBuf,
    /// Lock/PID file
    pub lock_path: PathBuf,
    /// Endpoint given on the command line, if any
    pub source: Option<String>,
    pub tail: bool,
    pub id_shape: IdShape,
    pub supervisor: SupervisorConfig,
    pub flusher: FlusherConfig,
    pub transport: WsConfig,
}

impl Config {
    /// Default configuration rooted at `state_dir`
    pub fn for_state_dir(state_dir: PathBuf) -> Self {
        Self {
            store_path: state_dir.join("store.jsonl"),
            log_path: state_dir.join("daemon.log"),
            lock_path: state_dir.join("daemon.pid"),
            state_dir,
            source: None,
            tail: false,
            id_shape: IdShape::default(),
            supervisor: SupervisorConfig::default(),
            flusher: FlusherConfig::default(),
            transport: WsConfig::default(),
        }
    }
}

/// Pick the state directory: explicit flag, then `LOGCRUNCH_STATE_DIR`,
/// then `XDG_STATE_HOME`, then `~/.local/state`.
fn resolve_state_dir(
    explicit: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(dir) = env(STATE_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = env("XDG_STATE_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(xdg).join("logcrunch"));
    }

    let home = env("HOME")
        .filter(|d| !d.is_empty())
        .ok_or(LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/logcrunch"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
