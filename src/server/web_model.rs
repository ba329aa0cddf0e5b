// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

use actix_web::error::JsonPayloadError;
use actix_web::{Error, HttpRequest, HttpResponse, error};
use serde::{Deserialize, Serialize};
use serde_with::{OneOrMany, serde_as};

/// Rest API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

impl<'a> ApiResponse<'a> {
    pub fn new(code: &'a str, message: &'a str) -> ApiResponse<'a> {
        ApiResponse {
            code: Some(code),
            message: Some(message),
        }
    }
}

pub fn json_error_handler(err: error::JsonPayloadError, _: &HttpRequest) -> Error {
    let message = err.to_string();

    let resp = match &err {
        JsonPayloadError::ContentType => HttpResponse::UnsupportedMediaType()
            .json(ApiResponse::new("UNSUPPORTED_MEDIA_TYPE", &message)),
        JsonPayloadError::Deserialize(json_err) if json_err.is_data() => {
            HttpResponse::BadRequest().json(ApiResponse::new("INVALID_JSON", &message))
        }
        _ => HttpResponse::BadRequest().json(ApiResponse::new("BAD_REQUEST", &message)),
    };

    error::InternalError::from_response(err, resp).into()
}

/// Percent-open cover position: 0 = closed, 100 = open.
#[derive(Debug, Deserialize)]
pub struct CoverPosition {
    pub position: u8,
}

/// Parameters of the `set_absolute_position` service.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct AbsolutePositionRequest {
    /// Single entity id or list of entity ids.
    #[serde_as(as = "OneOrMany<_>")]
    pub entity_id: Vec<String>,
    /// Absolute position: -100..100
    pub position: i32,
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub user_id: u32,
    pub api_key: String,
}
