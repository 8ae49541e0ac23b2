use std::{env, fs, net::SocketAddr, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub node: Node,
    #[serde(default)]
    pub capture: Capture,
    #[serde(default)]
    pub collect: Collect,
    #[serde(default)]
    pub service: Service,
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
pub struct Node {
    /// Fleet-unique name; qualifies every artifact this node produces.
    #[serde(default = "default_alias")]
    pub alias: String,
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    /// "auto" probes for rpicam-vid and falls back to the ffmpeg backend.
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// V4L2 device for the ffmpeg backend; unset means the built-in test
    /// pattern source.
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collect {
    /// Base URL of the orchestrator's ingest endpoint.
    #[serde(default = "default_collect_url")]
    pub url: String,
    /// Overall deadline for one artifact push. Generous: a push carries a
    /// whole take over a LAN.
    #[serde(default = "default_collect_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    /// Request a clean exit once a transfer succeeds; the supervisor
    /// relaunches the service with a fresh process.
    #[serde(default)]
    pub exit_after_transfer: bool,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("5000"))
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

fn default_alias() -> String {
    env::var("HOSTNAME").unwrap_or_else(|_| "camnode".to_string())
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("media")
}

fn default_backend() -> String {
    "auto".to_string()
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_fps() -> u32 {
    30
}

fn default_collect_url() -> String {
    "http://127.0.0.1:8888".to_string()
}

fn default_collect_timeout_ms() -> u64 {
    600_000
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

impl Default for Node {
    fn default() -> Self {
        Self {
            alias: default_alias(),
            media_dir: default_media_dir(),
        }
    }
}

impl Default for Capture {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            device: None,
        }
    }
}

impl Default for Collect {
    fn default() -> Self {
        Self {
            url: default_collect_url(),
            timeout_ms: default_collect_timeout_ms(),
        }
    }
}

impl Config {
    pub fn parse(path: Option<String>) -> Self {
        let result = fs::read_to_string(path.unwrap_or(String::from("camnode.toml")))
            .or(fs::read_to_string("/etc/camfleet/camnode.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str()).expect("config parse error");
        match cfg.validate() {
            Ok(_) => cfg,
            Err(err) => panic!("config validate [{}]", err),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.capture.fps == 0 || self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow::anyhow!("capture geometry must be non-zero"));
        }
        if !matches!(self.capture.backend.as_str(), "auto" | "rpicam" | "ffmpeg") {
            return Err(anyhow::anyhow!(
                "capture backend must be one of auto, rpicam, ffmpeg"
            ));
        }
        url::Url::parse(&self.collect.url)
            .map_err(|e| anyhow::anyhow!("collect url: {}", e))?;
        Ok(())
    }
}
