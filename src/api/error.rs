// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Sunsa API client errors.

use crate::errors::ServiceError;
use awc::error::{JsonPayloadError, SendRequestError};
use derive_more::Display;

/// HTTP status returned by the Sunsa API for an invalid user id or API key.
pub const HTTP_UNAUTHORIZED: u16 = 401;

#[derive(Clone, Debug, Display, PartialEq)]
pub enum ApiError {
    /// The API responded with a non-success HTTP status.
    #[display("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[display("Connection error: {_0}")]
    Connection(String),
    #[display("Request timeout")]
    Timeout,
    /// The response body couldn't be parsed.
    #[display("Invalid response: {_0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Returns true if the request was rejected because of invalid credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::Http { status, .. } if *status == HTTP_UNAUTHORIZED)
    }
}

impl std::error::Error for ApiError {}

impl From<SendRequestError> for ApiError {
    fn from(e: SendRequestError) -> Self {
        match e {
            SendRequestError::Timeout => ApiError::Timeout,
            e => ApiError::Connection(e.to_string()),
        }
    }
}

impl From<JsonPayloadError> for ApiError {
    fn from(e: JsonPayloadError) -> Self {
        ApiError::InvalidResponse(e.to_string())
    }
}

impl From<ApiError> for ServiceError {
    fn from(e: ApiError) -> Self {
        match e {
            e if e.is_auth_error() => ServiceError::AuthenticationFailed(e.to_string()),
            ApiError::Connection(_) | ApiError::Timeout => ServiceError::NotConnected,
            e => ServiceError::ServiceUnavailable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn http(status: u16) -> ApiError {
        ApiError::Http {
            status,
            message: String::new(),
        }
    }

    #[rstest]
    #[case(http(401), true)]
    #[case(http(403), false)]
    #[case(http(404), false)]
    #[case(http(500), false)]
    #[case(ApiError::Timeout, false)]
    #[case(ApiError::Connection("refused".into()), false)]
    #[case(ApiError::InvalidResponse("eof".into()), false)]
    fn only_http_401_is_an_auth_error(#[case] error: ApiError, #[case] expected: bool) {
        assert_eq!(expected, error.is_auth_error());
    }

    #[test]
    fn auth_error_converts_to_authentication_failed() {
        let err: ServiceError = http(401).into();
        assert!(matches!(err, ServiceError::AuthenticationFailed(_)));
    }

    #[test]
    fn timeout_converts_to_not_connected() {
        let err: ServiceError = ApiError::Timeout.into();
        assert_eq!(ServiceError::NotConnected, err);
    }
}
