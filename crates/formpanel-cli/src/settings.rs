//! `formpanel.toml` handling for the binary.
//!
//! The `[form]` table is read by [`FormOptions::from_toml_str`]; the binary
//! only adds the `[endpoint]` table.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use formpanel_core::FormOptions;
use serde::Deserialize;

/// Default test endpoint timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub form: FormOptions,
    pub endpoint: EndpointSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub url: Option<String>,
    pub timeout: Duration,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SettingsToml {
    endpoint: Option<EndpointSection>,
}

#[derive(Debug, Deserialize)]
struct EndpointSection {
    url: Option<String>,
    timeout_ms: Option<u64>,
}

impl Settings {
    /// Reads `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self {
                form: FormOptions::default(),
                endpoint: EndpointSettings::default(),
            });
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let form = FormOptions::from_toml_str(text)?;
        let raw: SettingsToml = toml::from_str(text).context("formpanel.toml")?;
        let mut endpoint = EndpointSettings::default();
        if let Some(section) = raw.endpoint {
            endpoint.url = section.url.filter(|url| !url.trim().is_empty());
            if let Some(timeout_ms) = section.timeout_ms {
                if timeout_ms == 0 {
                    anyhow::bail!("invalid endpoint.timeout_ms '0'");
                }
                endpoint.timeout = Duration::from_millis(timeout_ms);
            }
        }
        Ok(Self { form, endpoint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpanel_core::TabPolicy;

    #[test]
    fn both_tables_are_read() {
        let settings = Settings::from_toml_str(
            r#"
[form]
tab_policy = "linear"

[endpoint]
url = "http://cms.local/fieldchecker/test"
timeout_ms = 2500
"#,
        )
        .unwrap();
        assert_eq!(settings.form.tab_policy, TabPolicy::Linear);
        assert_eq!(
            settings.endpoint.url.as_deref(),
            Some("http://cms.local/fieldchecker/test")
        );
        assert_eq!(settings.endpoint.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn missing_tables_fall_back_to_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.form, FormOptions::default());
        assert_eq!(settings.endpoint, EndpointSettings::default());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Settings::from_toml_str("[endpoint]\ntimeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }
}
