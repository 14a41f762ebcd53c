//! Configuration for the scheduler, loaded from `FLEET_*` environment variables.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet_id::GroupKey;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    /// SQLite state file; in-memory when unset.
    pub state_path: Option<PathBuf>,
    pub framework_name: String,
    pub refuse_window: Duration,
    pub event_buffer: usize,
    pub command_buffer: usize,
    /// Desired counts from the environment; these override stored values.
    pub requirements: BTreeMap<GroupKey, u32>,
    pub task: TaskConfig,
}

/// Shape of every launched worker.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    pub image: String,
    pub cpus: f64,
    pub mem: f64,
    pub container_port: u64,
    pub command: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            image: "docker.elastic.co/kibana/kibana:8.15.0".to_string(),
            cpus: 0.1,
            mem: 128.0,
            container_port: 5601,
            command: "/usr/share/kibana/bin/kibana".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = env_or("FLEET_LISTEN_ADDR", "127.0.0.1:8080")
            .parse()
            .context("FLEET_LISTEN_ADDR")?;

        let log_level = env_or("FLEET_LOG_LEVEL", "info");

        let state_path = std::env::var("FLEET_STATE_PATH").ok().map(PathBuf::from);

        let framework_name = env_or("FLEET_FRAMEWORK_NAME", "fleet");

        let refuse_window = Duration::from_secs(parse_env("FLEET_REFUSE_SECONDS", 1)?);
        let event_buffer = parse_env("FLEET_EVENT_BUFFER", 256)?;
        let command_buffer = parse_env("FLEET_COMMAND_BUFFER", 1024)?;

        let requirements = match std::env::var("FLEET_REQUIREMENTS") {
            Ok(raw) => parse_requirements(&raw).context("FLEET_REQUIREMENTS")?,
            Err(_) => BTreeMap::new(),
        };

        let defaults = TaskConfig::default();
        let task = TaskConfig {
            image: env_or("FLEET_TASK_IMAGE", &defaults.image),
            cpus: parse_env("FLEET_TASK_CPUS", defaults.cpus)?,
            mem: parse_env("FLEET_TASK_MEM", defaults.mem)?,
            container_port: parse_env("FLEET_TASK_CONTAINER_PORT", defaults.container_port)?,
            command: env_or("FLEET_TASK_COMMAND", &defaults.command),
        };

        Ok(Self {
            listen_addr,
            log_level,
            state_path,
            framework_name,
            refuse_window,
            event_buffer,
            command_buffer,
            requirements,
            task,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Parse `url=count,url=count`. Entries split on the last `=`, so URLs with
/// query strings survive. A repeated URL keeps the last count.
pub fn parse_requirements(raw: &str) -> Result<BTreeMap<GroupKey, u32>> {
    let mut requirements = BTreeMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (url, count) = entry
            .rsplit_once('=')
            .with_context(|| format!("expected <url>=<count>, got {entry:?}"))?;
        let group = GroupKey::parse(url).with_context(|| format!("invalid group {url:?}"))?;
        let count: u32 = count
            .trim()
            .parse()
            .with_context(|| format!("invalid count in {entry:?}"))?;
        requirements.insert(group, count);
    }

    Ok(requirements)
}
