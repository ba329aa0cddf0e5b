// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Sunsa cloud API client.
//!
//! Only the two public API operations required for polling and positioning are implemented:
//! listing all devices of an account and updating the position of a single device.

mod error;
mod model;

pub use error::*;
pub use model::*;

use crate::configuration::SunsaSettings;
use crate::util::new_http_client;
use awc::http::header;
use log::{debug, warn};
use strum::{AsRefStr, Display};
use url::Url;

/// Max size of a device list response.
const MAX_RESPONSE_SIZE: usize = 256 * 1024;

const AUTH_HEADER: &str = "X-Auth-Token";

/// Sunsa API client bound to one account.
///
/// Cloning is cheap, the underlying HTTP client is shared.
#[derive(Clone)]
pub struct SunsaClient {
    http: awc::Client,
    base_url: Url,
    user_id: u32,
    api_key: String,
}

impl SunsaClient {
    pub fn new(http: awc::Client, base_url: Url, user_id: u32, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            user_id,
            api_key: api_key.into(),
        }
    }

    /// Create a new client with its own HTTP client from the given settings.
    pub fn from_settings(settings: &SunsaSettings, disable_cert_verification: bool) -> Self {
        let http = new_http_client(
            settings.request_timeout,
            settings.url.scheme() == "https",
            settings.disable_cert_validation || disable_cert_verification,
        );
        Self::new(
            http,
            settings.url.clone(),
            settings.user_id,
            settings.api_key(),
        )
    }

    /// Return a copy of this client using different account credentials.
    pub fn with_credentials(&self, user_id: u32, api_key: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            user_id,
            api_key: api_key.into(),
        }
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    /// Retrieve all devices of the account.
    pub async fn get_devices(&self) -> Result<Vec<Device>, ApiError> {
        let url = self.url(&format!("{}/devices", self.user_id))?;
        debug!("GET {url}");

        let mut response = self
            .http
            .get(url.as_str())
            .insert_header((header::ACCEPT, "application/json"))
            .insert_header((AUTH_HEADER, self.api_key.as_str()))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.body().await.unwrap_or_default();
            return Err(ApiError::Http {
                status,
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let list: DeviceList = response.json().limit(MAX_RESPONSE_SIZE).await?;
        debug!("Received {} devices", list.devices.len());
        Ok(list.devices)
    }

    /// Move a blind to the given absolute position.
    pub async fn update_device(&self, device_id: DeviceId, position: i32) -> Result<(), ApiError> {
        let url = self.url(&format!("{}/devices/{device_id}", self.user_id))?;
        debug!("PUT {url}: position={position}");

        let mut response = self
            .http
            .put(url.as_str())
            .insert_header((header::ACCEPT, "application/json"))
            .insert_header((AUTH_HEADER, self.api_key.as_str()))
            .send_json(&PositionUpdate { position })
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.body().await.unwrap_or_default();
            warn!("Position update of device {device_id} failed with HTTP {status}");
            return Err(ApiError::Http {
                status,
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Connection(format!("Invalid API url: {e}")))
    }
}

/// Credential validation result category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CredentialError {
    InvalidAuth,
    CannotConnect,
    Unknown,
}

impl From<&ApiError> for CredentialError {
    fn from(e: &ApiError) -> Self {
        match e {
            e if e.is_auth_error() => CredentialError::InvalidAuth,
            ApiError::Http { .. } | ApiError::Connection(_) | ApiError::Timeout => {
                CredentialError::CannotConnect
            }
            ApiError::InvalidResponse(_) => CredentialError::Unknown,
        }
    }
}

/// Validate account credentials by retrieving the device list.
///
/// Returns the devices of the account, or the error category together with the error detail.
pub async fn validate_credentials(
    client: &SunsaClient,
) -> Result<Vec<Device>, (CredentialError, ApiError)> {
    client.get_devices().await.map_err(|e| {
        debug!("Credential validation failed: {e}");
        (CredentialError::from(&e), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ApiError::Http { status: 401, message: "".into() }, CredentialError::InvalidAuth)]
    #[case(ApiError::Http { status: 500, message: "".into() }, CredentialError::CannotConnect)]
    #[case(ApiError::Timeout, CredentialError::CannotConnect)]
    #[case(ApiError::Connection("dns".into()), CredentialError::CannotConnect)]
    #[case(ApiError::InvalidResponse("eof".into()), CredentialError::Unknown)]
    fn credential_errors_are_classified(
        #[case] error: ApiError,
        #[case] expected: CredentialError,
    ) {
        assert_eq!(expected, CredentialError::from(&error));
    }

    #[test]
    fn credential_error_names_are_snake_case() {
        assert_eq!("invalid_auth", CredentialError::InvalidAuth.as_ref());
        assert_eq!("cannot_connect", CredentialError::CannotConnect.to_string());
    }

    #[actix_web::test]
    async fn urls_are_relative_to_base_url() {
        let client = SunsaClient::new(
            awc::Client::default(),
            Url::parse("https://example.com/api/public/").unwrap(),
            42,
            "key",
        );
        assert_eq!(
            "https://example.com/api/public/42/devices/7",
            client.url("42/devices/7").unwrap().as_str()
        );
    }
}
