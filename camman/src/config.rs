use std::{collections::HashSet, env, fs, net::SocketAddr, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub fleet: Fleet,
    #[serde(default)]
    pub probe: Probe,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub remote: Remote,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// One capture node. The set is static per deployment; list order defines
/// the default dispatch order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Node {
    pub alias: String,
    pub url: String,
    /// Host for the out-of-band remote execution channel (ssh). Empty
    /// means service lifecycle actions are unavailable for this node.
    #[serde(default)]
    pub host: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fleet {
    /// Cap on concurrent in-flight node calls during a fan-out.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    #[serde(default = "default_probe_tick_ms")]
    pub tick_time_ms: u64,
    #[serde(default = "default_probe_connect_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Alias of the node acting as master for capture sessions. Unset
    /// means the first configured node.
    #[serde(default)]
    pub master: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    /// Where transferred artifacts land. Append-only: an existing name is
    /// never overwritten.
    #[serde(default = "default_storage_dir")]
    pub directory: PathBuf,
    /// Upper bound on one ingest push. Recordings are whole takes, so this
    /// must be well past axum's 2 MB default body limit.
    #[serde(default = "default_max_artifact_size_mb")]
    pub max_artifact_size_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remote {
    #[serde(default = "default_start_command")]
    pub start_command: String,
    #[serde(default = "default_stop_command")]
    pub stop_command: String,
    #[serde(default = "default_update_command")]
    pub update_command: String,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("8888"))
    ))
    .expect("invalid listen address")
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_max_in_flight() -> usize {
    8
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_probe_tick_ms() -> u64 {
    5_000
}

fn default_probe_connect_ms() -> u64 {
    500
}

fn default_probe_timeout_ms() -> u64 {
    1_000
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_max_artifact_size_mb() -> usize {
    4096
}

fn default_start_command() -> String {
    "ssh {host} systemctl restart camnode".to_string()
}

fn default_stop_command() -> String {
    "ssh {host} systemctl stop camnode".to_string()
}

fn default_update_command() -> String {
    "ssh {host} /usr/local/bin/camnode-update".to_string()
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Fleet {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            tick_time_ms: default_probe_tick_ms(),
            connect_timeout_ms: default_probe_connect_ms(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            directory: default_storage_dir(),
            max_artifact_size_mb: default_max_artifact_size_mb(),
        }
    }
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            start_command: default_start_command(),
            stop_command: default_stop_command(),
            update_command: default_update_command(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl Config {
    pub fn parse(path: Option<String>) -> Self {
        let result = fs::read_to_string(path.unwrap_or(String::from("camman.toml")))
            .or(fs::read_to_string("/etc/camfleet/camman.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str()).expect("config parse error");
        match cfg.validate() {
            Ok(_) => cfg,
            Err(err) => panic!("config validate [{}]", err),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.alias.as_str()) {
                return Err(anyhow::anyhow!("duplicate node alias: {}", node.alias));
            }
            url::Url::parse(&node.url)
                .map_err(|e| anyhow::anyhow!("node {} url: {}", node.alias, e))?;
        }
        if let Some(master) = &self.session.master {
            if !self.nodes.iter().any(|n| &n.alias == master) {
                return Err(anyhow::anyhow!(
                    "session master {} is not a configured node",
                    master
                ));
            }
        }
        if self.fleet.max_in_flight == 0 {
            return Err(anyhow::anyhow!("fleet max_in_flight must be at least 1"));
        }
        if self.storage.max_artifact_size_mb == 0 {
            return Err(anyhow::anyhow!(
                "storage max_artifact_size_mb must be at least 1"
            ));
        }
        Ok(())
    }
}
