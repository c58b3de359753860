use crate::chat::DEFAULT_POLL_INTERVAL_MS;
use crate::error::{ChatError, Result};
use crate::remote::memory::DEFAULT_PASSWORD;
use clap::Parser;
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const ENV_ENDPOINT: &str = "COVENANT_ENDPOINT";
pub const ENV_POLL_INTERVAL_MS: &str = "COVENANT_POLL_INTERVAL_MS";
pub const ENV_DATA_DIR: &str = "COVENANT_DATA_DIR";

#[derive(Debug, Clone, Parser)]
#[command(name = "covenant-chat", version, about = "Password-gated two-party chat")]
pub struct Cli {
    /// JSON-RPC endpoint of the message store [env: COVENANT_ENDPOINT].
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Refresh interval in milliseconds [env: COVENANT_POLL_INTERVAL_MS].
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Directory for the device profile and config file [env: COVENANT_DATA_DIR].
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Run against an in-process store instead of a remote endpoint.
    #[arg(long)]
    pub demo: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    endpoint: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    demo: Option<bool>,
    demo_password: Option<String>,
}

/// Values taken from `COVENANT_*` variables. Blank values count as unset.
#[derive(Debug, Default)]
struct EnvConfig {
    endpoint: Option<String>,
    poll_interval_ms: Option<u64>,
    data_dir: Option<PathBuf>,
}

impl EnvConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let poll_interval_ms = match var(ENV_POLL_INTERVAL_MS) {
            Some(raw) => Some(raw.trim().parse().map_err(|err| {
                ChatError::Config(format!("invalid {ENV_POLL_INTERVAL_MS} {raw:?}: {err}"))
            })?),
            None => None,
        };

        Ok(Self {
            endpoint: var(ENV_ENDPOINT),
            poll_interval_ms,
            data_dir: var(ENV_DATA_DIR).map(PathBuf::from),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub endpoint: Option<String>,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub data_dir: PathBuf,
    pub demo: bool,
    pub demo_password: String,
}

impl ChatConfig {
    fn defaults(data_dir: PathBuf) -> Self {
        Self {
            endpoint: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            data_dir,
            demo: false,
            demo_password: DEFAULT_PASSWORD.to_string(),
        }
    }

    /// Defaults, then `<data_dir>/config.json`, then environment and flags.
    pub fn resolve(cli: Cli) -> Result<Self> {
        Self::resolve_with_env(cli, |key| std::env::var(key).ok())
    }

    fn resolve_with_env<F>(cli: Cli, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvConfig::from_lookup(lookup)?;
        let data_dir = match cli.data_dir.or(env.data_dir) {
            Some(dir) => dir,
            None => default_data_dir()?,
        };

        let mut config = Self::defaults(data_dir);
        let file = read_file_config(&config.data_dir.join(CONFIG_FILE))?;
        config.apply_file(file);

        if env.endpoint.is_some() {
            config.endpoint = env.endpoint;
        }
        if let Some(poll_interval_ms) = env.poll_interval_ms {
            config.poll_interval_ms = poll_interval_ms;
        }

        if cli.endpoint.is_some() {
            config.endpoint = cli.endpoint;
        }
        if let Some(poll_interval_ms) = cli.poll_interval_ms {
            config.poll_interval_ms = poll_interval_ms;
        }
        config.demo |= cli.demo;

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if file.endpoint.is_some() {
            self.endpoint = file.endpoint;
        }
        if let Some(poll_interval_ms) = file.poll_interval_ms {
            self.poll_interval_ms = poll_interval_ms;
        }
        if let Some(request_timeout_secs) = file.request_timeout_secs {
            self.request_timeout_secs = request_timeout_secs;
        }
        if let Some(demo) = file.demo {
            self.demo = demo;
        }
        if let Some(demo_password) = file.demo_password {
            self.demo_password = demo_password;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(ChatError::Config("poll interval must be positive".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ChatError::Config("request timeout must be positive".to_string()));
        }
        if !self.demo && self.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
            return Err(ChatError::Config(
                "no endpoint configured; pass --endpoint or --demo".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "covenant", "covenant-chat")
        .ok_or_else(|| ChatError::Config("cannot determine data directory".to_string()))?;
    Ok(dirs.data_dir().to_path_buf())
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    match fs::read(path) {
        Ok(data) => {
            let file = serde_json::from_slice(&data).map_err(|err| {
                ChatError::Config(format!("failed to parse {}: {err}", path.display()))
            })?;
            debug!(path = %path.display(), "loaded config file");
            Ok(file)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatConfig, Cli, CONFIG_FILE, ENV_DATA_DIR, ENV_ENDPOINT, ENV_POLL_INTERVAL_MS};
    use crate::error::Result;
    use clap::Parser;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    fn cli(dir: &Path, extra: &[&str]) -> Cli {
        let mut args = vec![
            "covenant-chat".to_string(),
            "--data-dir".to_string(),
            dir.display().to_string(),
        ];
        args.extend(extra.iter().map(|arg| arg.to_string()));
        Cli::parse_from(args)
    }

    fn resolve(cli: Cli, env: &[(&str, &str)]) -> Result<ChatConfig> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ChatConfig::resolve_with_env(cli, |key| env.get(key).cloned())
    }

    #[test]
    fn demo_mode_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = resolve(cli(dir.path(), &["--demo"]), &[]).expect("config should resolve");
        assert!(config.demo);
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.demo_password, "icp");
        assert_eq!(config.data_dir, dir.path());
    }

    #[test]
    fn missing_endpoint_without_demo_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let err = resolve(cli(dir.path(), &[]), &[]).expect_err("config should fail");
        assert!(err.to_string().contains("no endpoint configured"));
    }

    #[test]
    fn file_overrides_defaults_and_flags_override_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "endpoint": "http://file/rpc", "poll_interval_ms": 5000, "request_timeout_secs": 3 }"#,
        )
        .expect("config fixture should write");

        let from_file = resolve(cli(dir.path(), &[]), &[]).expect("config should resolve");
        assert_eq!(from_file.endpoint.as_deref(), Some("http://file/rpc"));
        assert_eq!(from_file.poll_interval_ms, 5000);
        assert_eq!(from_file.request_timeout_secs, 3);

        let overridden = resolve(
            cli(
                dir.path(),
                &["--endpoint", "http://flag/rpc", "--poll-interval-ms", "1000"],
            ),
            &[],
        )
        .expect("config should resolve");
        assert_eq!(overridden.endpoint.as_deref(), Some("http://flag/rpc"));
        assert_eq!(overridden.poll_interval_ms, 1000);
    }

    #[test]
    fn env_overrides_file_and_flags_override_env() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "endpoint": "http://file/rpc", "poll_interval_ms": 5000 }"#,
        )
        .expect("config fixture should write");
        let env = [
            (ENV_ENDPOINT, "http://env/rpc"),
            (ENV_POLL_INTERVAL_MS, "7000"),
        ];

        let from_env = resolve(cli(dir.path(), &[]), &env).expect("config should resolve");
        assert_eq!(from_env.endpoint.as_deref(), Some("http://env/rpc"));
        assert_eq!(from_env.poll_interval_ms, 7000);

        let from_flag = resolve(cli(dir.path(), &["--poll-interval-ms", "1000"]), &env)
            .expect("config should resolve");
        assert_eq!(from_flag.endpoint.as_deref(), Some("http://env/rpc"));
        assert_eq!(from_flag.poll_interval_ms, 1000);
    }

    #[test]
    fn env_data_dir_is_used_without_flag() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let data_dir = dir.path().display().to_string();
        let config = resolve(
            Cli::parse_from(["covenant-chat", "--demo"]),
            &[(ENV_DATA_DIR, data_dir.as_str())],
        )
        .expect("config should resolve");
        assert_eq!(config.data_dir, dir.path());
    }

    #[test]
    fn blank_env_values_are_ignored_and_bad_numbers_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let err = resolve(cli(dir.path(), &[]), &[(ENV_ENDPOINT, "  ")])
            .expect_err("blank endpoint should not count");
        assert!(err.to_string().contains("no endpoint configured"));

        let err = resolve(cli(dir.path(), &["--demo"]), &[(ENV_POLL_INTERVAL_MS, "soon")])
            .expect_err("non-numeric interval should fail");
        assert!(err.to_string().contains(ENV_POLL_INTERVAL_MS));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let result = resolve(cli(dir.path(), &["--demo", "--poll-interval-ms", "0"]), &[]);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(dir.path().join(CONFIG_FILE), "{ \"unknown_key\": 1 }")
            .expect("config fixture should write");
        let err = resolve(cli(dir.path(), &["--demo"]), &[]).expect_err("config should fail");
        assert!(err.to_string().contains("failed to parse"));
    }
}
