pub mod schema;

pub use schema::{TaiyoConfig, DEFAULT_SYSTEM_PROMPT};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the Ollama host.
pub const ENV_HOST: &str = "OLLAMA_HOST";
/// Environment variable overriding the model.
pub const ENV_MODEL: &str = "TAIYO_MODEL";
/// Environment variable overriding the working directory.
pub const ENV_CWD: &str = "TAIYO_CWD";

/// Default taiyo home directory (~/.taiyo).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".taiyo"))
        .unwrap_or_else(|| PathBuf::from(".taiyo"))
}

/// Default config file location (~/.taiyo/config.toml).
pub fn default_config_path() -> PathBuf {
    default_home_dir().join("config.toml")
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<TaiyoConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read taiyo config file")?;
        let config: TaiyoConfig =
            toml::from_str(&contents).context("Failed to parse taiyo config (TOML)")?;
        Ok(config)
    } else {
        Ok(TaiyoConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &TaiyoConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

/// Apply environment overrides on top of file/default values.
///
/// `lookup` is `std::env::var` in production; tests pass a closure.
pub fn apply_env_overrides<F>(config: &mut TaiyoConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_HOST).filter(|v| !v.is_empty()) {
        config.ollama_host = normalize_host(&host);
    }
    if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.is_empty()) {
        config.model = model;
    }
    if let Some(cwd) = lookup(ENV_CWD).filter(|v| !v.is_empty()) {
        config.working_dir = config.resolve_path(&cwd);
    }
}

/// Ollama accepts a bare `host:port` in OLLAMA_HOST; give it a scheme.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.max_tool_rounds, 15);
        assert_eq!(config.ollama_host, "http://localhost:11434");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"llama3.1:8b\"\ntemperature = 0.5\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.model, "llama3.1:8b");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.request_timeout_secs, 300);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [unterminated").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = TaiyoConfig::default();
        config.set_model("mistral");
        config.working_dir = dir.path().to_path_buf();

        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            (ENV_HOST, "127.0.0.1:11500"),
            (ENV_MODEL, "codellama"),
            (ENV_CWD, "/tmp/project"),
        ]
        .into_iter()
        .collect();

        let mut config = TaiyoConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.ollama_host, "http://127.0.0.1:11500");
        assert_eq!(config.model, "codellama");
        assert_eq!(config.working_dir, PathBuf::from("/tmp/project"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = TaiyoConfig::default();
        let before = config.clone();
        apply_env_overrides(&mut config, |_| Some(String::new()));
        assert_eq!(config, before);
    }

    #[test]
    fn relative_session_dir_is_under_working_dir() {
        let mut config = TaiyoConfig::default();
        config.working_dir = PathBuf::from("/work");
        assert_eq!(config.resolved_session_dir(), PathBuf::from("/work/.taiyo"));

        config.session_dir = "/var/log/taiyo".into();
        assert_eq!(config.resolved_session_dir(), PathBuf::from("/var/log/taiyo"));
    }
}
