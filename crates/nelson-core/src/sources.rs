use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::provider::Provider;
use crate::ConfigError;

/// Provider enablement as read from `sources.yaml`.
///
/// ```yaml
/// providers:
///   dtf: true
///   stopgame: false
/// ```
///
/// Providers absent from the file are disabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub providers: BTreeMap<String, bool>,
}

impl SourcesConfig {
    /// Enabled providers in registry order.
    #[must_use]
    pub fn enabled(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.providers.get(p.as_str()).copied().unwrap_or(false))
            .collect()
    }

    /// A config that enables every known provider.
    #[must_use]
    pub fn all_enabled() -> Self {
        Self {
            providers: Provider::ALL
                .iter()
                .map(|p| (p.as_str().to_string(), true))
                .collect(),
        }
    }
}

/// Load and validate the provider configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or names a
/// provider that does not exist.
pub fn load_sources_config(path: &Path) -> Result<SourcesConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources_config(&content)
}

/// Parse and validate provider configuration from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML or unknown provider names.
pub fn parse_sources_config(yaml: &str) -> Result<SourcesConfig, ConfigError> {
    let config: SourcesConfig = serde_yaml::from_str(yaml)?;
    validate_sources(&config)?;
    Ok(config)
}

fn validate_sources(config: &SourcesConfig) -> Result<(), ConfigError> {
    let unknown: Vec<&str> = config
        .providers
        .keys()
        .filter(|name| name.parse::<Provider>().is_err())
        .map(String::as_str)
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "unknown providers: {}",
            unknown.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_follows_registry_order_and_flags() {
        let config = parse_sources_config(
            "providers:\n  stopgame: true\n  dtf: true\n  epicgames: false\n",
        )
        .unwrap();
        assert_eq!(config.enabled(), vec![Provider::Dtf, Provider::StopGame]);
    }

    #[test]
    fn missing_providers_section_enables_nothing() {
        let config = parse_sources_config("{}").unwrap();
        assert!(config.enabled().is_empty());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = parse_sources_config("providers:\n  dtf: true\n  reddit: true\n");
        assert!(
            matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("reddit")),
            "expected Validation error, got: {result:?}"
        );
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let result = parse_sources_config("providers: [dtf");
        assert!(matches!(result, Err(ConfigError::SourcesFileParse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_sources_config(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(ConfigError::SourcesFileIo { .. })));
    }

    #[test]
    fn all_enabled_covers_every_provider() {
        assert_eq!(SourcesConfig::all_enabled().enabled(), Provider::ALL.to_vec());
    }
}
