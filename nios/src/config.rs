//! Provider configuration with environment fallbacks

use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::client::{DEFAULT_TIMEOUT_SECONDS, DEFAULT_WAPI_VERSION};
use crate::api::ClientConfig;

pub const ENV_HOST_URL: &str = "NIOS_HOST_URL";
pub const ENV_USERNAME: &str = "NIOS_USERNAME";
pub const ENV_PASSWORD: &str = "NIOS_PASSWORD";
pub const ENV_WAPI_VERSION: &str = "NIOS_WAPI_VERSION";
pub const ENV_INSECURE: &str = "NIOS_INSECURE";

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub host_url: String,
    pub username: String,
    pub password: String,
    pub wapi_version: String,
    pub insecure: bool,
    pub timeout_seconds: u64,
}

fn config_string(config: &DynamicValue, name: &str) -> Option<String> {
    config
        .get_known(&AttributePath::new(name))
        .and_then(Dynamic::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

impl ProviderConfig {
    /// Read the provider block, falling back to `NIOS_*` variables for
    /// anything left unset. Every missing required value is reported.
    pub fn from_dynamic(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let mut diagnostics = vec![];
        let mut required = |attr: &str, env: &str| {
            let value = config_string(config, attr).or_else(|| env_string(env));
            if value.is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} is required", attr),
                        format!("Set {} in the provider block or the {} environment variable", attr, env),
                    )
                    .with_attribute(AttributePath::new(attr)),
                );
            }
            value.unwrap_or_default()
        };

        let host_url = required("nios_host_url", ENV_HOST_URL);
        let username = required("nios_username", ENV_USERNAME);
        let password = required("nios_password", ENV_PASSWORD);

        let wapi_version = config_string(config, "wapi_version")
            .or_else(|| env_string(ENV_WAPI_VERSION))
            .unwrap_or_else(|| DEFAULT_WAPI_VERSION.to_string());

        let insecure = config
            .get_known(&AttributePath::new("insecure"))
            .and_then(Dynamic::as_bool)
            .or_else(|| env_string(ENV_INSECURE).and_then(|v| v.parse::<bool>().ok()))
            .unwrap_or(false);

        let timeout_seconds = match config
            .get_known(&AttributePath::new("timeout_seconds"))
            .and_then(Dynamic::as_number)
        {
            None => DEFAULT_TIMEOUT_SECONDS,
            Some(n) if n >= 1.0 && n.fract() == 0.0 => n as u64,
            Some(n) => {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid timeout_seconds",
                        format!("Expected a whole number of seconds, got {}", n),
                    )
                    .with_attribute(AttributePath::new("timeout_seconds")),
                );
                DEFAULT_TIMEOUT_SECONDS
            }
        };

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        Ok(Self {
            host_url,
            username,
            password,
            wapi_version,
            insecure,
            timeout_seconds,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host_url: self.host_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            wapi_version: self.wapi_version.clone(),
            insecure: self.insecure,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::utils::flex::json_to_dynamic;
    use serde_json::json;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            ENV_HOST_URL,
            ENV_USERNAME,
            ENV_PASSWORD,
            ENV_WAPI_VERSION,
            ENV_INSECURE,
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn config_block_wins_over_env() {
        clear_env();
        std::env::set_var(ENV_HOST_URL, "https://env.example.com");
        std::env::set_var(ENV_USERNAME, "env-user");
        std::env::set_var(ENV_PASSWORD, "env-pass");

        let config = DynamicValue::new(json_to_dynamic(&json!({
            "nios_host_url": "https://gm.example.com",
            "nios_username": null,
            "timeout_seconds": 30
        })));
        let parsed = ProviderConfig::from_dynamic(&config).unwrap();
        assert_eq!(parsed.host_url, "https://gm.example.com");
        assert_eq!(parsed.username, "env-user");
        assert_eq!(parsed.password, "env-pass");
        assert_eq!(parsed.wapi_version, DEFAULT_WAPI_VERSION);
        assert_eq!(parsed.timeout_seconds, 30);
        assert!(!parsed.insecure);

        clear_env();
    }

    #[test]
    #[serial]
    fn env_supplies_version_and_insecure() {
        clear_env();
        std::env::set_var(ENV_WAPI_VERSION, "2.12");
        std::env::set_var(ENV_INSECURE, "true");

        let config = DynamicValue::new(json_to_dynamic(&json!({
            "nios_host_url": "https://gm.example.com",
            "nios_username": "admin",
            "nios_password": "infoblox"
        })));
        let parsed = ProviderConfig::from_dynamic(&config).unwrap();
        assert_eq!(parsed.wapi_version, "2.12");
        assert!(parsed.insecure);
        assert_eq!(parsed.client_config().timeout_seconds, DEFAULT_TIMEOUT_SECONDS);

        clear_env();
    }

    #[test]
    #[serial]
    fn missing_credentials_are_all_reported() {
        clear_env();
        let diagnostics = ProviderConfig::from_dynamic(&DynamicValue::null()).unwrap_err();
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics[0].summary.contains("nios_host_url is required"));
        assert!(diagnostics[2].detail.contains(ENV_PASSWORD));
    }

    #[test]
    #[serial]
    fn fractional_timeout_is_rejected() {
        clear_env();
        let config = DynamicValue::new(json_to_dynamic(&json!({
            "nios_host_url": "https://gm.example.com",
            "nios_username": "admin",
            "nios_password": "infoblox",
            "timeout_seconds": 1.5
        })));
        let diagnostics = ProviderConfig::from_dynamic(&config).unwrap_err();
        assert_eq!(diagnostics[0].summary, "Invalid timeout_seconds");
    }
}
