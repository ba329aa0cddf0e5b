// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for cover commands and the `set_absolute_position` service.

use crate::api::DeviceId;
use crate::controller::{Controller, CoverCommandMsg, SetAbsolutePosition};
use crate::coordinator::{Coordinator, UpdatePosition};
use crate::entity::{CoverEntity, CoverCommand, SunsaEntity, validate_absolute_position};
use crate::errors::ServiceError;
use actix::{Addr, Handler, ResponseFuture};
use futures::future::join_all;
use log::{error, info};

/// Blind to reposition.
struct Target {
    device_id: DeviceId,
    name: String,
}

impl Controller {
    fn cover_target(&self, entity_id: &str) -> Result<(&CoverEntity, Target), ServiceError> {
        let cover = match self.entities.get(entity_id) {
            Some(SunsaEntity::Cover(cover)) => cover,
            Some(_) => {
                return Err(ServiceError::BadRequest(format!(
                    "Entity {entity_id} is not a cover"
                )));
            }
            None => {
                return Err(ServiceError::NotFound(format!(
                    "Entity {entity_id} not found"
                )));
            }
        };
        let target = Target {
            device_id: cover.base().device_id(),
            name: cover.base().device_name().to_string(),
        };
        Ok((cover, target))
    }

    /// Absolute position for a cover command, mapped with the device's closing direction.
    fn command_position(
        &self,
        entity_id: &str,
        command: CoverCommand,
    ) -> Result<(Target, i32), ServiceError> {
        let (cover, target) = self.cover_target(entity_id)?;
        let device = cover.base().device(&self.data).ok_or_else(|| {
            ServiceError::ServiceUnavailable(format!("{} is not available", target.name))
        })?;
        let position = CoverEntity::target_position(device, command, self.settings.position_step)?;
        Ok((target, position))
    }
}

async fn reposition(
    coordinator: &Addr<Coordinator>,
    target: &Target,
    position: i32,
) -> Result<(), ServiceError> {
    let device_id = target.device_id;
    coordinator
        .send(UpdatePosition {
            device_id,
            position,
        })
        .await?
        .map_err(|e| {
            error!("Unable to reposition {}: {e}", target.name);
            if e.is_auth_error() {
                ServiceError::from(e)
            } else {
                ServiceError::ServiceUnavailable(format!(
                    "Unable to reposition {}: {e}",
                    target.name
                ))
            }
        })
}

impl Handler<CoverCommandMsg> for Controller {
    type Result = ResponseFuture<Result<(), ServiceError>>;

    fn handle(&mut self, msg: CoverCommandMsg, _ctx: &mut Self::Context) -> Self::Result {
        let request = self.command_position(&msg.entity_id, msg.command);
        let coordinator = self.coordinator.clone();

        Box::pin(async move {
            let (target, position) = request?;
            info!(
                "{}: {:?} -> absolute position {position}",
                msg.entity_id, msg.command
            );
            reposition(&coordinator, &target, position).await
        })
    }
}

impl Handler<SetAbsolutePosition> for Controller {
    type Result = ResponseFuture<Result<(), ServiceError>>;

    fn handle(&mut self, msg: SetAbsolutePosition, _ctx: &mut Self::Context) -> Self::Result {
        let request = validate_absolute_position(msg.position).and_then(|position| {
            if msg.entity_ids.is_empty() {
                return Err(ServiceError::BadRequest("Missing entity_id".into()));
            }
            let mut targets = Vec::with_capacity(msg.entity_ids.len());
            for entity_id in &msg.entity_ids {
                let (_, target) = self.cover_target(entity_id)?;
                if !targets.iter().any(|t: &Target| t.device_id == target.device_id) {
                    targets.push(target);
                }
            }
            Ok((targets, position))
        });
        let coordinator = self.coordinator.clone();

        Box::pin(async move {
            let (targets, position) = request?;
            info!("set_absolute_position {position}: {:?}", msg.entity_ids);
            join_all(
                targets
                    .iter()
                    .map(|target| reposition(&coordinator, target, position)),
            )
            .await
            .into_iter()
            .collect::<Result<(), ServiceError>>()
        })
    }
}
