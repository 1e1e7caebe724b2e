use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Returns the location of the user's configuration file
///
/// This is `$XDG_CONFIG_HOME/opendir-dl/config.toml` on Linux and the
/// platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("opendir-dl").join("config.toml"))
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use opendir_dl::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Workers: {}", config.crawler.workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config: Config = toml::from_str(&content)?;
    config.base_dir = path.parent().map(Path::to_path_buf);

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the settings they used.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Loads the configuration the command line asked for
///
/// An explicit path must exist. Without one, the default location is tried
/// and a missing file yields `Config::default()`.
///
/// # Returns
///
/// The configuration and, when a file was read, its hash.
pub fn load_or_default(explicit: Option<&Path>) -> Result<(Config, Option<String>), ConfigError> {
    if let Some(path) = explicit {
        let (config, hash) = load_config_with_hash(path)?;
        return Ok((config, Some(hash)));
    }

    match default_config_path() {
        Some(path) if path.is_file() => {
            let (config, hash) = load_config_with_hash(&path)?;
            Ok((config, Some(hash)))
        }
        _ => Ok((Config::default(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::DedupMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
workers = 8
quick = true
max-depth = 3
write-batch-size = 16

[http]
user-agent = "TestCrawler/1.0"
timeout-secs = 30

[catalog]
default-path = "/tmp/catalog.db"
dedup = "substring"
output-dir = "/tmp/downloads"

[[profile]]
name = "music"
resource = "music.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.workers, 8);
        assert!(config.crawler.quick);
        assert_eq!(config.crawler.max_depth, Some(3));
        assert_eq!(config.crawler.write_batch_size, 16);
        assert_eq!(config.crawler.poll_interval_ms, 1000);
        assert_eq!(config.http.user_agent, "TestCrawler/1.0");
        assert_eq!(config.http.timeout_secs, Some(30));
        assert_eq!(config.catalog.dedup, DedupMode::Substring);
        assert_eq!(config.profiles.len(), 1);
        assert_eq!(config.base_dir.as_deref(), file.path().parent());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[crawler]\nworkers = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let result = load_or_default(Some(Path::new("/nonexistent/opendir-dl.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_path_returns_hash() {
        let file = create_temp_config("[crawler]\nworkers = 2\n");
        let (config, hash) = load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.crawler.workers, 2);
        assert_eq!(hash.map(|h| h.len()), Some(64));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
