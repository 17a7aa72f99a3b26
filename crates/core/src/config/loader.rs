//! Figment-based loading: the TOML file first, then `NABGATE_*` variables.
//!
//! Nested keys use a double underscore, so `NABGATE_SERVER__PUBLIC_URL`
//! overrides `server.public_url` without splitting the field name.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

pub const ENV_PREFIX: &str = "NABGATE_";
const ENV_NESTING: &str = "__";

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_with_env_prefix(path, ENV_PREFIX)
}

fn load_with_env_prefix(path: &Path, prefix: &str) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::from(Toml::file(path))
        .merge(Env::prefixed(prefix).split(ENV_NESTING))
        .extract()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Parse a TOML document with no environment layer.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_auth_and_port() {
        let config = load_config_from_str("[auth]\napi_key = \"abc\"\n\n[server]\nport = 9000\n")
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let result = load_config_from_str("[server]\nport = \"not-a-port\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_directory_is_not_a_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path());
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_file_values() {
        let file = config_file(
            "[auth]\npassphrase = \"serverpass\"\n\n[server]\nhost = \"127.0.0.1\"\nport = 3000\n",
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.auth.passphrase.as_deref(), Some("serverpass"));
    }

    #[test]
    fn test_env_overrides_nested_key_with_underscores() {
        let file = config_file("[server]\nport = 3000\npublic_url = \"http://file.example\"\n");
        // A prefix of its own keeps this test isolated from the rest of the process.
        std::env::set_var("NABGATE_LOADERTEST_SERVER__PUBLIC_URL", "http://env.example");

        let config = load_with_env_prefix(file.path(), "NABGATE_LOADERTEST_").unwrap();
        std::env::remove_var("NABGATE_LOADERTEST_SERVER__PUBLIC_URL");

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.public_url(), "http://env.example");
    }
}
