// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Configuration file handling.

use crate::errors::ServiceError;
use config::Config;
use log::{error, info, warn};
use serde_with::{DurationSeconds, serde_as};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use url::Url;

/// Default configuration file.
pub const DEF_CONFIG_FILE: &str = "configuration.yaml";

/// Default Sunsa public API base URL.
pub const DEF_API_URL: &str = "https://app.sunsahome.com/api/public/";

pub const DEF_UPDATE_INTERVAL_SEC: u64 = 15;
pub const MIN_UPDATE_INTERVAL_SEC: u64 = 10;
pub const MAX_UPDATE_INTERVAL_SEC: u64 = 300;
pub const DEF_REQUEST_TIMEOUT_SEC: u64 = 15;
pub const MAX_POSITION_STEP: u8 = 50;

/// Environment variable prefix for configuration overrides.
///
/// Nested keys are separated with `__`, e.g. `SUNSA_SUNSA__API_KEY` sets `sunsa.api_key`.
pub const ENV_PREFIX: &str = "SUNSA";

const ENV_USER_CFG_FILENAME: &str = "SUNSA_USER_CFG_FILENAME";
const DEF_USER_CFG_FILENAME: &str = "sunsa.json";

/// Environment variable for the user configuration directory.
///
/// Credentials updated at runtime are stored in this directory.
const ENV_CONFIG_HOME: &str = "SUNSA_CONFIG_HOME";

/// Environment variable to disable TLS verification to the Sunsa API.
///
/// **Attention:** this setting is only for debugging!
pub const ENV_DISABLE_CERT_VERIFICATION: &str = "SUNSA_DISABLE_CERT_VERIFICATION";

#[derive(Default, serde::Deserialize, serde::Serialize)]
pub struct Settings {
    pub integration: IntegrationSettings,
    pub sunsa: SunsaSettings,
}

#[derive(Clone, serde::Deserialize, serde::Serialize)]
pub struct IntegrationSettings {
    pub interface: String,
    pub http: WebServerSettings,
    /// Optional shared secret for the REST API. Must be sent in the `auth-token` header.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            interface: "0.0.0.0".to_string(),
            http: WebServerSettings {
                enabled: true,
                port: 8000,
            },
            token: None,
        }
    }
}

#[derive(Clone, serde::Deserialize, serde::Serialize)]
pub struct WebServerSettings {
    pub enabled: bool,
    pub port: u16,
}

/// Sunsa cloud account and polling settings.
#[serde_as]
#[derive(Clone, serde::Deserialize, serde::Serialize)]
pub struct SunsaSettings {
    pub url: Url,
    /// Account e-mail, only used as display title.
    #[serde(default)]
    pub email: String,
    pub user_id: u32,
    api_key: String,
    /// Total time allowed for a single API request.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "request_timeout_sec", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Device state polling interval.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "update_interval_sec", default = "default_update_interval")]
    pub update_interval: Duration,
    /// Round issued absolute positions to a multiple of this step. `1` disables rounding.
    #[serde(default = "default_position_step")]
    pub position_step: u8,
    /// Disables certificate verification for the Sunsa API connection.
    #[serde(default)]
    pub disable_cert_validation: bool,
}

impl Default for SunsaSettings {
    fn default() -> Self {
        Self {
            url: Url::parse(DEF_API_URL).expect("valid default url"),
            email: String::new(),
            user_id: 0,
            api_key: String::new(),
            request_timeout: default_request_timeout(),
            update_interval: default_update_interval(),
            position_step: default_position_step(),
            disable_cert_validation: false,
        }
    }
}

impl Debug for SunsaSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // never log the api key
        f.debug_struct("SunsaSettings")
            .field("url", &self.url.as_str())
            .field("email", &self.email)
            .field("user_id", &self.user_id)
            .field("request_timeout", &self.request_timeout)
            .field("update_interval", &self.update_interval)
            .field("position_step", &self.position_step)
            .field("disable_cert_validation", &self.disable_cert_validation)
            .finish()
    }
}

impl SunsaSettings {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn set_api_key(&mut self, api_key: impl AsRef<str>) {
        self.api_key = api_key.as_ref().trim().to_string();
    }

    /// Checks if a user id and API key have been provided.
    pub fn has_credentials(&self) -> bool {
        self.user_id > 0 && !self.api_key.is_empty()
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEF_REQUEST_TIMEOUT_SEC)
}
fn default_update_interval() -> Duration {
    Duration::from_secs(DEF_UPDATE_INTERVAL_SEC)
}
fn default_position_step() -> u8 {
    1
}

/// Load the configuration settings.
///
/// The application provides default values which can be overridden in the following order:
/// 1. Configuration settings in the read-only yaml configuration file specified in `filename`
/// 2. User provided credentials stored at runtime with [`save_user_settings`]
/// 3. Environment variables with prefix `SUNSA_`
///
/// If there's a configuration load error, the configuration will be reloaded without the user
/// provided settings for auto-recovery.
pub fn get_configuration(filename: Option<&str>) -> Result<Settings, config::ConfigError> {
    get_configuration_with_user_settings(filename, &user_settings_path())
}

/// Load the configuration settings with the user settings file at the given location.
///
/// See [`get_configuration`].
pub fn get_configuration_with_user_settings(
    filename: Option<&str>,
    user_config: &Path,
) -> Result<Settings, config::ConfigError> {
    if !user_config.is_file() {
        info!("No user settings file found");
        return load_configuration(filename, None);
    }

    match load_configuration(filename, Some(user_config.to_path_buf())) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            error!("Error loading configuration, retrying without user configuration. Error: {e}");
            load_configuration(filename, None)
        }
    }
}

fn load_configuration(
    filename: Option<&str>,
    user_config: Option<PathBuf>,
) -> Result<Settings, config::ConfigError> {
    let mut config = Config::builder().add_source(Config::try_from(&Settings::default())?);
    if let Some(filename) = filename {
        config = config.add_source(config::File::with_name(filename));
    }
    if let Some(user_config) = user_config {
        config = config.add_source(config::File::from(user_config));
    }

    // E.g. `SUNSA_SUNSA__USER_ID=1234` sets the `sunsa.user_id` key
    let config = config
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings: Settings = config.try_deserialize()?;

    check_cfg_values(settings)
}

fn check_cfg_values(mut settings: Settings) -> Result<Settings, config::ConfigError> {
    let sunsa = &mut settings.sunsa;
    let interval = sunsa.update_interval.as_secs();
    if !(MIN_UPDATE_INTERVAL_SEC..=MAX_UPDATE_INTERVAL_SEC).contains(&interval) {
        warn!(
            "Invalid update interval {interval}s, using default of {DEF_UPDATE_INTERVAL_SEC}s."
        );
        sunsa.update_interval = default_update_interval();
    }

    if sunsa.request_timeout.is_zero() || sunsa.request_timeout > sunsa.update_interval {
        warn!("Invalid request timeout, using default.");
        sunsa.request_timeout = default_request_timeout().min(sunsa.update_interval);
    }

    if sunsa.position_step == 0 || sunsa.position_step > MAX_POSITION_STEP {
        warn!("Invalid position step {}, rounding disabled.", sunsa.position_step);
        sunsa.position_step = default_position_step();
    }

    match sunsa.url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(config::ConfigError::Message(format!(
                "invalid scheme in sunsa.url: {scheme}. Valid: [http, https]"
            )));
        }
    }
    // Url::join replaces the last path segment without a trailing slash
    if !sunsa.url.path().ends_with('/') {
        let path = format!("{}/", sunsa.url.path());
        sunsa.url.set_path(&path);
    }

    Ok(settings)
}

/// Wrapper to add the `sunsa` root property to make it compatible with the main configuration file.
#[derive(serde::Deserialize, serde::Serialize)]
struct UserSettingsWrapper {
    sunsa: UserCredentials,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct UserCredentials {
    user_id: u32,
    api_key: String,
}

/// Store updated account credentials in the user settings file.
pub fn save_user_settings(path: &Path, cfg: &SunsaSettings) -> Result<(), ServiceError> {
    let cfg = UserSettingsWrapper {
        sunsa: UserCredentials {
            user_id: cfg.user_id,
            api_key: cfg.api_key.clone(),
        },
    };
    fs::write(path, serde_json::to_string_pretty(&cfg)?).map_err(|e| {
        let msg = format!("Error saving user configuration: {e}");
        error!("{msg}");
        ServiceError::InternalServerError(msg)
    })?;
    Ok(())
}

/// Get user configuration file path.
///
/// The configuration file is located in the directory specified in the env variable
/// `SUNSA_CONFIG_HOME`. If not set, the current directory is used.
pub fn user_settings_path() -> PathBuf {
    let file = env::var(ENV_USER_CFG_FILENAME).unwrap_or(DEF_USER_CFG_FILENAME.into());
    Path::new(&env::var(ENV_CONFIG_HOME).unwrap_or_default()).join(file)
}
