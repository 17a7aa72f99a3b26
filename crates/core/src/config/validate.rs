use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration for semantic correctness
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port must be non-zero".to_string(),
        ));
    }

    if let Some(url) = &config.server.public_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "server.public_url must start with http:// or https://, got '{}'",
                url
            )));
        }
    }

    let cache = &config.cache;
    if cache.search_capacity == 0 || cache.status_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "cache capacities must be greater than zero".to_string(),
        ));
    }
    if cache.search_ttl_secs == 0 || cache.status_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache TTLs must be greater than zero".to_string(),
        ));
    }

    if config.search.max_pages == 0 {
        return Err(ConfigError::ValidationError(
            "search.max_pages must be greater than zero".to_string(),
        ));
    }
    if config.search.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "search.channel_capacity must be greater than zero".to_string(),
        ));
    }

    let mut names = HashSet::new();
    let mut disabled = HashSet::new();
    if let Some(jackett) = &config.jackett {
        if jackett.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "jackett.url must not be empty".to_string(),
            ));
        }
        if jackett.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "jackett.timeout_secs must be greater than zero".to_string(),
            ));
        }

        for indexer in &jackett.indexers {
            validate_name("indexer", &indexer.name)?;
            if !names.insert(indexer.name.to_lowercase()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate indexer name '{}'",
                    indexer.name
                )));
            }
            if !indexer.enabled {
                disabled.insert(indexer.name.to_lowercase());
            }
        }
    }

    for (alias, targets) in &config.aliases {
        validate_name("alias", alias)?;
        if names.contains(&alias.to_lowercase()) {
            return Err(ConfigError::ValidationError(format!(
                "alias '{}' shadows an indexer of the same name",
                alias
            )));
        }
        if targets.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "alias '{}' has no indexers",
                alias
            )));
        }
        for target in targets {
            let target_key = target.to_lowercase();
            if !names.contains(&target_key) {
                return Err(ConfigError::ValidationError(format!(
                    "alias '{}' references unknown indexer '{}'",
                    alias, target
                )));
            }
            // Disabled indexers are never registered, so the alias could not resolve.
            if disabled.contains(&target_key) {
                return Err(ConfigError::ValidationError(format!(
                    "alias '{}' references disabled indexer '{}'",
                    alias, target
                )));
            }
        }
    }

    Ok(())
}

fn validate_name(kind: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} name must not be empty",
            kind
        )));
    }
    if name.contains(',') || name.contains('/') {
        return Err(ConfigError::ValidationError(format!(
            "{} name '{}' must not contain ',' or '/'",
            kind, name
        )));
    }
    if name.eq_ignore_ascii_case("all") {
        return Err(ConfigError::ValidationError(format!(
            "'{}' is reserved and cannot be used as {} name",
            name, kind
        )));
    }
    Ok(())
}
