use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Keys from `credentials.keys-file` are merged into `credentials.keys`
/// before validation. A relative keys file is resolved against the
/// directory holding the configuration file.
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
/// use scopus_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("References depth: {}", config.crawler.references_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let mut config: Config = toml::from_str(&content)?;

    if let Some(keys_file) = config.credentials.keys_file.clone() {
        let keys_path = match path.parent() {
            Some(dir) if Path::new(&keys_file).is_relative() => dir.join(&keys_file),
            _ => keys_file.into(),
        };
        let keys = read_keys_file(&keys_path)?;
        tracing::debug!("Loaded {} keys from {}", keys.len(), keys_path.display());
        config.credentials.keys.extend(keys);
    }

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Reads API keys, one per line
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_keys_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Computes a SHA-256 hash of the data-source catalog
///
/// Sources are hashed in name order, so reordering `[[source]]` tables keeps
/// the hash. Any change to a source name, path, key list or pagination flag
/// changes it.
///
/// # Returns
///
/// * Hex-encoded SHA-256 hash of the catalog entries
pub fn compute_catalog_hash(config: &Config) -> String {
    let mut sources: Vec<_> = config.sources.iter().collect();
    sources.sort_by(|a, b| a.name.cmp(&b.name));

    let mut hasher = Sha256::new();
    for source in sources {
        hasher.update(source.name.as_bytes());
        hasher.update([0]);
        hasher.update(source.path.as_bytes());
        hasher.update([0]);
        hasher.update(source.keys.join(",").as_bytes());
        hasher.update([0]);
        hasher.update([u8::from(source.paginated)]);
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its catalog hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_catalog_hash(&config);
    Ok((config, hash))
}
