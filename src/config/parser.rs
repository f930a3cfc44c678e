//! YAML parser for harvester configuration
//!
//! Parses and validates configuration files.

use super::types::{CollectorConfig, CollectorKind, CredentialConfig, HarvestConfig};
use crate::credentials::Capability;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<HarvestConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_config_from_str(&content)
}

/// Load a configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<HarvestConfig> {
    let config: HarvestConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate a configuration
pub fn validate_config(config: &HarvestConfig) -> Result<()> {
    if config.collectors.is_empty() {
        return Err(Error::config("Config must define at least one collector"));
    }

    let names: HashSet<_> = config.collectors.iter().map(|c| &c.name).collect();
    if names.len() != config.collectors.len() {
        return Err(Error::config("Duplicate collector names found"));
    }

    if config.fetch.page_size == 0 {
        return Err(Error::invalid_value("fetch.page_size", "must be positive"));
    }
    if config.stream.reconnect_minutes == 0 {
        return Err(Error::invalid_value(
            "stream.reconnect_minutes",
            "must be positive",
        ));
    }

    validate_tier("credentials.polling", &config.credentials.polling)?;
    validate_tier("credentials.streaming", &config.credentials.streaming)?;

    for collector in &config.collectors {
        validate_collector(config, collector)?;
    }

    Ok(())
}

fn validate_tier(tier: &str, credentials: &[CredentialConfig]) -> Result<()> {
    let names: HashSet<_> = credentials.iter().map(|c| &c.name).collect();
    if names.len() != credentials.len() {
        return Err(Error::config(format!("Duplicate credential names in {tier}")));
    }

    for credential in credentials {
        if credential.name.is_empty() {
            return Err(Error::config(format!("Credential name in {tier} cannot be empty")));
        }
        if credential.token.is_none() && credential.token_env.is_none() {
            return Err(Error::config(format!(
                "Credential '{}' needs either token or token_env",
                credential.name
            )));
        }
    }
    Ok(())
}

fn validate_collector(config: &HarvestConfig, collector: &CollectorConfig) -> Result<()> {
    let name = &collector.name;
    if name.is_empty() {
        return Err(Error::config("Collector name cannot be empty"));
    }
    if collector.interval_minutes == 0 {
        return Err(Error::invalid_value(
            format!("collectors.{name}.interval_minutes"),
            "must be positive",
        ));
    }

    match collector.kind {
        CollectorKind::Stream { ref terms } => {
            if terms.is_empty() {
                return Err(Error::config(format!(
                    "Stream collector '{name}' needs at least one term"
                )));
            }
            if config.api.stream_url.is_none() {
                return Err(Error::missing_field("api.stream_url"));
            }
        }
        CollectorKind::Subjects { ref subjects, .. } if subjects.is_empty() => {
            return Err(Error::config(format!(
                "Subjects collector '{name}' needs at least one subject"
            )));
        }
        _ => {}
    }

    if collector.is_polling() && collector.query.is_empty() {
        return Err(Error::config(format!(
            "Collector '{name}' query cannot be empty"
        )));
    }

    let (tier, credentials, defaults) = if collector.is_polling() {
        (
            "credentials.polling",
            &config.credentials.polling,
            Capability::polling(),
        )
    } else {
        (
            "credentials.streaming",
            &config.credentials.streaming,
            vec![Capability::Streaming],
        )
    };

    if credentials.is_empty() {
        return Err(Error::config(format!(
            "Collector '{name}' needs at least one credential in {tier}"
        )));
    }

    let required = collector.kind.required_capability();
    for credential in credentials {
        let capabilities = credential.capabilities.as_ref().unwrap_or(&defaults);
        if !capabilities.contains(&required) {
            return Err(Error::config(format!(
                "Credential '{}' lacks the {required} capability needed by collector '{name}'",
                credential.name
            )));
        }
    }

    Ok(())
}

impl CredentialConfig {
    /// Resolve the bearer token, reading `token_env` when set
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(ref token) = self.token {
            return Ok(token.clone());
        }
        let var = self
            .token_env
            .as_deref()
            .ok_or_else(|| Error::missing_field(format!("{}.token", self.name)))?;
        std::env::var(var).map_err(|_| {
            Error::config(format!(
                "Environment variable '{var}' for credential '{}' is not set",
                self.name
            ))
        })
    }
}
