//! Project configuration: Supabase URL, API key and server port.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_PORT: u16 = 8080;

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    pub api_key: String,
    pub server_port: u16,
}

/// Config file structure. Every field is optional; the environment can fill
/// in or override any of them.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub server_port: Option<u16>,
}

impl Config {
    /// Default config file location (`~/.config/schemasync/config.json` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("schemasync").join("config.json"))
    }

    /// Load from the given file (or the default location, if present) and
    /// the process environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                let expanded = shellexpand::tilde(path).to_string();
                Some(read_file(Path::new(&expanded))?)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Some(read_file(&path)?),
                _ => None,
            },
        };

        Self::resolve(file.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    /// Merge file values with environment lookups and validate the result.
    pub fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = env("SUPABASE_URL")
            .or(file.url)
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/')
            .to_string();
        let api_key = env("SUPABASE_API_KEY")
            .or_else(|| env("SUPABASE_KEY"))
            .or(file.api_key)
            .unwrap_or_default()
            .trim()
            .to_string();
        let server_port = match env("SCHEMASYNC_PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid SCHEMASYNC_PORT: {}", port)))?,
            None => file.server_port.unwrap_or(DEFAULT_PORT),
        };

        if url.is_empty() {
            return Err(Error::Config(
                "Supabase URL not configured. Set SUPABASE_URL or `url` in the config file".into(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Supabase URL must start with http:// or https://, got {}",
                url
            )));
        }
        if api_key.is_empty() {
            return Err(Error::Config(
                "Supabase API key not configured. Set SUPABASE_API_KEY or `api_key` in the config file"
                    .into(),
            ));
        }

        Ok(Self {
            url,
            api_key,
            server_port,
        })
    }
}

fn read_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| Error::Decode {
        what: "config file",
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_resolve_from_env() {
        let config = Config::resolve(
            ConfigFile::default(),
            env(&[
                ("SUPABASE_URL", "https://demo.supabase.co/"),
                ("SUPABASE_API_KEY", "secret"),
            ]),
        )
        .unwrap();

        assert_eq!(
            config,
            Config {
                url: "https://demo.supabase.co".into(),
                api_key: "secret".into(),
                server_port: 8080,
            }
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let file = ConfigFile {
            url: Some("https://file.supabase.co".into()),
            api_key: Some("file-key".into()),
            server_port: Some(9000),
        };
        let config = Config::resolve(file, env(&[("SUPABASE_KEY", "env-key")])).unwrap();

        assert_eq!(config.url, "https://file.supabase.co");
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.server_port, 9000);
    }

    #[test]
    fn test_missing_values_are_config_errors() {
        let err = Config::resolve(ConfigFile::default(), env(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::resolve(
            ConfigFile::default(),
            env(&[("SUPABASE_URL", "https://demo.supabase.co")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("API key"));

        let err = Config::resolve(
            ConfigFile::default(),
            env(&[("SUPABASE_URL", "demo.supabase.co"), ("SUPABASE_API_KEY", "k")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::resolve(
            ConfigFile::default(),
            env(&[
                ("SUPABASE_URL", "https://demo.supabase.co"),
                ("SUPABASE_API_KEY", "k"),
                ("SCHEMASYNC_PORT", "eighty"),
            ]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "configuration error: invalid SCHEMASYNC_PORT: eighty");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"url":"https://demo.supabase.co","api_key":"k","server_port":3000}"#)
            .unwrap();

        let file = read_file(&path).unwrap();
        let config = Config::resolve(file, env(&[])).unwrap();
        assert_eq!(config.server_port, 3000);

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(read_file(&path).unwrap_err(), Error::Decode { .. }));
    }
}
