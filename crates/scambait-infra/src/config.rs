//! Memory configuration loader.
//!
//! Reads `config.toml` from the given directory and deserializes it into
//! [`MemoryConfig`]. Falls back to defaults when the file is missing or
//! malformed, and lets `SCAMBAIT_DATABASE_URL` override the connection
//! string so deployments can keep credentials out of the file.

use std::path::Path;

use scambait_types::config::MemoryConfig;

/// Load memory configuration from `{dir}/config.toml`.
///
/// - Missing file: returns [`MemoryConfig::default()`].
/// - Unparseable file: logs a warning, returns the default.
/// - `SCAMBAIT_DATABASE_URL`, when set and non-empty, overrides
///   `database_url` from either source.
pub async fn load_memory_config(dir: &Path) -> MemoryConfig {
    let config_path = dir.join("config.toml");

    let mut config = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => match toml::from_str::<MemoryConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    "Failed to parse {}: {err}, using defaults",
                    config_path.display()
                );
                MemoryConfig::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            MemoryConfig::default()
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            MemoryConfig::default()
        }
    };

    if let Ok(url) = std::env::var("SCAMBAIT_DATABASE_URL") {
        if !url.is_empty() {
            config.database_url = Some(url);
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_memory_config(tmp.path()).await;
        assert_eq!(config.pool_max_connections, 10);
        assert_eq!(config.recent_message_limit, 20);
    }

    #[tokio::test]
    async fn load_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
database_url = "postgres://localhost/scambait"
pool_max_connections = 6
hnsw_ef_search = 150
"#,
        )
        .await
        .unwrap();

        let config = load_memory_config(tmp.path()).await;
        assert_eq!(config.pool_max_connections, 6);
        assert_eq!(config.hnsw_ef_search, 150);
    }

    #[tokio::test]
    async fn load_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "not { valid toml !!!")
            .await
            .unwrap();

        let config = load_memory_config(tmp.path()).await;
        assert_eq!(config.pool_min_connections, 3);
    }
}
