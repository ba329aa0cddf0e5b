// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Actix actor message definitions used to communicate with the [`Coordinator`].

#[allow(unused_imports)] // used for doc links
use crate::coordinator::Coordinator;
use crate::api::{ApiError, DeviceId};
use crate::coordinator::{CoordinatorData, UpdateError};
use crate::errors::ServiceError;
use actix::prelude::{Message, Recipient};
use std::sync::Arc;

/// Refresh the device states immediately.
///
/// If a refresh is already in progress, its result is returned instead of starting another device
/// request. The polling timer restarts after the refresh.
#[derive(Debug, Default, Message)]
#[rtype(result = "Result<(), UpdateError>")]
pub struct RequestRefresh;

/// Event sent to all subscribers after every completed update, successful or not.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct DataUpdated(pub Arc<CoordinatorData>);

/// Subscribe to [`DataUpdated`] events.
///
/// The current data is sent immediately if an update already happened.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe(pub Recipient<DataUpdated>);

/// Get the latest coordinator data.
#[derive(Debug, Default, Message)]
#[rtype(result = "Arc<CoordinatorData>")]
pub struct GetData;

/// Move a blind to an absolute position. A refresh is requested after a successful update.
#[derive(Debug, Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct UpdatePosition {
    pub device_id: DeviceId,
    pub position: i32,
}

/// Replace the account credentials after validating them with the Sunsa API.
///
/// Resumes polling if it was stopped due to an authentication failure.
#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct UpdateCredentials {
    pub user_id: u32,
    pub api_key: String,
}
