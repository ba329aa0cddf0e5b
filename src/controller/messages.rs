// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Actix actor message definitions used to communicate with the [`Controller`].
//!
//! These are the messages used by the REST API to query entities and trigger device commands.

#[allow(unused_imports)] // used for doc links
use crate::controller::Controller;
use crate::entity::{CoverCommand, EntityState};
use crate::errors::ServiceError;
use actix::prelude::Message;
use serde::Serialize;

/// Get the current state of all entities, ordered by entity id.
#[derive(Debug, Default, Message)]
#[rtype(result = "Vec<EntityState>")]
pub struct GetEntityStates;

/// Get the current state of a single entity.
#[derive(Debug, Message)]
#[rtype(result = "Result<EntityState, ServiceError>")]
pub struct GetEntityState {
    pub entity_id: String,
}

/// Get the integration status.
#[derive(Debug, Default, Message)]
#[rtype(result = "IntegrationStatus")]
pub struct GetStatus;

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationStatus {
    pub version: &'static str,
    /// Coordinator mode
    pub mode: &'static str,
    pub last_update_success: bool,
    /// Unix timestamp in seconds of the last completed update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub devices: usize,
    pub entities: usize,
}

/// Execute a cover command.
#[derive(Debug, Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct CoverCommandMsg {
    pub entity_id: String,
    pub command: CoverCommand,
}

/// Move all given covers to a raw absolute position without direction mapping.
///
/// All entity ids are validated before any request is sent.
#[derive(Debug, Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct SetAbsolutePosition {
    pub entity_ids: Vec<String>,
    pub position: i32,
}

/// Request an immediate device state refresh.
#[derive(Debug, Default, Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct RefreshMsg;

/// Re-authenticate with new account credentials.
///
/// Valid credentials are stored in the user settings file.
#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct UpdateCredentialsMsg {
    pub user_id: u32,
    pub api_key: String,
}
