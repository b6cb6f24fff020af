//! Configuration loading from files and environment variables.

use config::{Config, Environment, File, Source};

use crate::error::{ServiceError, ServiceResult};

use super::ServiceConfig;

/// Load configuration from `config.{toml,yaml,json}` and `OMEGA__*` env vars
pub fn load_config() -> ServiceResult<ServiceConfig> {
    load_from_sources(File::with_name("config").required(false), environment())
}

fn environment() -> Environment {
    Environment::with_prefix("OMEGA")
        .separator("__")
        .try_parsing(true)
}

/// Environment overrides the file source
fn load_from_sources<S>(file: S, env: Environment) -> ServiceResult<ServiceConfig>
where
    S: Source + Send + Sync + 'static,
{
    Config::builder()
        .add_source(file)
        .add_source(env)
        .build()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn env_with(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_defaults_without_sources() {
        let config =
            load_from_sources(File::from_str("", FileFormat::Toml), env_with(&[])).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.storage.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert!(config.chain.include_reports);
        assert!(config.web.static_dir.is_none());
    }

    #[test]
    fn test_file_values() {
        let toml = r#"
            [storage]
            upload_dir = "/srv/reports"

            [ollama]
            model = "medllama2"
        "#;
        let config =
            load_from_sources(File::from_str(toml, FileFormat::Toml), env_with(&[])).unwrap();

        assert_eq!(config.storage.upload_dir, PathBuf::from("/srv/reports"));
        assert_eq!(config.ollama.model, "medllama2");
        // Untouched fields in a present section keep their defaults
        assert_eq!(config.ollama.request_timeout_secs, 120);
    }

    #[test]
    fn test_env_overrides_file() {
        let toml = r#"
            [server]
            port = 8100
        "#;
        let env = env_with(&[
            ("OMEGA__SERVER__PORT", "9000"),
            ("OMEGA__CHAIN__INCLUDE_REPORTS", "false"),
        ]);
        let config = load_from_sources(File::from_str(toml, FileFormat::Toml), env).unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(!config.chain.include_reports);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let env = env_with(&[("OMEGA__SERVER__PORT", "not-a-port")]);
        let err = load_from_sources(File::from_str("", FileFormat::Toml), env).unwrap_err();

        assert!(matches!(err, ServiceError::Config { .. }));
    }
}
