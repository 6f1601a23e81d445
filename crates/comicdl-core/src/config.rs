use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Retry policy parameters for page requests (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

/// What to do when a fetch reports that the requested issue does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfRangePolicy {
    /// Stop admitting new issues; already admitted ones finish; the run succeeds.
    #[default]
    Stop,
    /// Treat it like any other fetch failure: cancel the run and report it.
    Fail,
}

/// HTTP client settings for the acomics source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Site root; issue pages live under `{base_url}/~{comic}/{id}`.
    pub base_url: String,
    pub user_agent: String,
    /// Proxy URL passed to curl, e.g. `socks5h://localhost:9050` for Tor.
    pub proxy: Option<String>,
    pub connect_timeout_secs: u64,
    /// Whole-transfer timeout per request.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://acomics.ru".to_string(),
            user_agent: "comicdl".to_string(),
            proxy: None,
            connect_timeout_secs: 30,
            timeout_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/comicdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComicdlConfig {
    /// Minimum delay between two issue admissions, in milliseconds.
    pub throttle_ms: u64,
    /// Maximum number of issues fetched at once.
    pub tickets: usize,
    /// Zero-padding width used when the number of issues is unknown.
    pub default_width: usize,
    /// Handling of the "issue does not exist" signal.
    #[serde(default)]
    pub end_of_range: EndOfRangePolicy,
    /// Deadline for the whole run in seconds (None = no deadline).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Directory holding one cache directory per comic (None = XDG cache dir).
    #[serde(default)]
    pub output_root: Option<PathBuf>,
    #[serde(default)]
    pub http: HttpConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for ComicdlConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 500,
            tickets: 2,
            default_width: 5,
            end_of_range: EndOfRangePolicy::Stop,
            timeout_secs: Some(3600),
            output_root: None,
            http: HttpConfig::default(),
            retry: None,
        }
    }
}

impl ComicdlConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Directory that holds the cached issues of `comic`.
    pub fn comic_dir(&self, comic: &str) -> Result<PathBuf> {
        let root = match &self.output_root {
            Some(root) => root.clone(),
            None => {
                let xdg_dirs = xdg::BaseDirectories::with_prefix("comicdl")?;
                xdg_dirs.get_cache_home().join("comicdl")
            }
        };
        Ok(root.join(comic))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("comicdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ComicdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ComicdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ComicdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ComicdlConfig::default();
        assert_eq!(cfg.throttle_ms, 500);
        assert_eq!(cfg.tickets, 2);
        assert_eq!(cfg.default_width, 5);
        assert_eq!(cfg.end_of_range, EndOfRangePolicy::Stop);
        assert_eq!(cfg.deadline(), Some(Duration::from_secs(3600)));
        assert_eq!(cfg.http.base_url, "https://acomics.ru");
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ComicdlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ComicdlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.throttle_ms, cfg.throttle_ms);
        assert_eq!(parsed.tickets, cfg.tickets);
        assert_eq!(parsed.timeout_secs, cfg.timeout_secs);
        assert_eq!(parsed.http.user_agent, cfg.http.user_agent);
    }

    #[test]
    fn config_toml_minimal_uses_section_defaults() {
        let toml = r#"
            throttle_ms = 100
            tickets = 4
            default_width = 3
        "#;
        let cfg: ComicdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.throttle(), Duration::from_millis(100));
        assert_eq!(cfg.tickets, 4);
        assert_eq!(cfg.end_of_range, EndOfRangePolicy::Stop);
        assert!(cfg.timeout_secs.is_none());
        assert!(cfg.output_root.is_none());
        assert!(cfg.retry.is_none());
        assert_eq!(cfg.http.connect_timeout_secs, 30);
    }

    #[test]
    fn config_toml_policy_http_and_retry() {
        let toml = r#"
            throttle_ms = 500
            tickets = 2
            default_width = 5
            end_of_range = "fail"
            output_root = "/srv/comics"

            [http]
            proxy = "socks5h://localhost:9050"

            [retry]
            max_attempts = 5
            base_delay_secs = 0.25
            max_delay_secs = 30
        "#;
        let cfg: ComicdlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.end_of_range, EndOfRangePolicy::Fail);
        assert_eq!(cfg.http.proxy.as_deref(), Some("socks5h://localhost:9050"));
        assert_eq!(cfg.http.base_url, "https://acomics.ru");
        assert_eq!(
            cfg.comic_dir("hero").unwrap(),
            PathBuf::from("/srv/comics/hero")
        );
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 5);
        assert!((retry.base_delay_secs - 0.25).abs() < 1e-9);
        assert_eq!(retry.max_delay_secs, 30);
    }
}
