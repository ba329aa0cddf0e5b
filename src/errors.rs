// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Custom application error with conversions from common Rust and 3rd-party errors.

use crate::server::ApiResponse;
use actix::MailboxError;
use actix::dev::SendError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use log::error;

#[derive(Debug, Display, PartialEq)]
pub enum ServiceError {
    #[display("Internal server error: {_0}")]
    InternalServerError(String),

    #[display("Internal serialization error: {_0}")]
    SerializationError(String),

    #[display("BadRequest: {_0}")]
    BadRequest(String),

    #[display("Not found: {_0}")]
    NotFound(String),

    #[display("Authentication failed: {_0}")]
    AuthenticationFailed(String),

    #[display("Sunsa API is not reachable")]
    NotConnected,

    #[display("Service unavailable: {_0}")]
    ServiceUnavailable(String),
}

impl ServiceError {
    /// Error code used in REST API error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InternalServerError(_) => "INTERNAL_ERROR",
            ServiceError::SerializationError(_) => "SERIALIZATION_ERROR",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::AuthenticationFailed(_) => "INVALID_AUTH",
            ServiceError::NotConnected => "NOT_CONNECTED",
            ServiceError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl std::error::Error for ServiceError {}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) | ServiceError::SerializationError(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotConnected | ServiceError::ServiceUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServiceError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        HttpResponse::build(self.status_code()).json(ApiResponse::new(self.code(), &message))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::InternalServerError(format!("{e:?}"))
    }
}

impl From<MailboxError> for ServiceError {
    fn from(e: MailboxError) -> Self {
        ServiceError::InternalServerError(format!("Internal message error: {e:?}"))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        error!("{e:?}");
        ServiceError::SerializationError(e.to_string())
    }
}

impl From<strum::ParseError> for ServiceError {
    fn from(e: strum::ParseError) -> Self {
        ServiceError::BadRequest(e.to_string())
    }
}

impl<T> From<SendError<T>> for ServiceError {
    fn from(e: SendError<T>) -> Self {
        ServiceError::InternalServerError(format!("Error sending internal message: {e:?}"))
    }
}
