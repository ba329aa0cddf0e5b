// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for entity state and status queries.

use crate::APP_VERSION;
use crate::controller::{
    Controller, GetEntityState, GetEntityStates, GetStatus, IntegrationStatus,
};
use crate::entity::EntityState;
use crate::errors::ServiceError;
use actix::{Handler, MessageResult};
use std::time::UNIX_EPOCH;

impl Handler<GetEntityStates> for Controller {
    type Result = MessageResult<GetEntityStates>;

    fn handle(&mut self, _msg: GetEntityStates, _ctx: &mut Self::Context) -> Self::Result {
        let states = self
            .entities
            .keys()
            .filter_map(|id| self.states.get(id))
            .cloned()
            .collect();
        MessageResult(states)
    }
}

impl Handler<GetEntityState> for Controller {
    type Result = Result<EntityState, ServiceError>;

    fn handle(&mut self, msg: GetEntityState, _ctx: &mut Self::Context) -> Self::Result {
        self.entity_state(&msg.entity_id)
    }
}

impl Handler<GetStatus> for Controller {
    type Result = MessageResult<GetStatus>;

    fn handle(&mut self, _msg: GetStatus, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(IntegrationStatus {
            version: APP_VERSION,
            mode: self.data.mode.as_str(),
            last_update_success: self.data.last_update_success,
            last_update: self
                .data
                .last_update
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs()),
            last_error: self.data.last_error.as_ref().map(ToString::to_string),
            devices: self.data.devices.len(),
            entities: self.entities.len(),
        })
    }
}
