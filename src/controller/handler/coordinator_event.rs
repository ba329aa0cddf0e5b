// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for coordinator events and coordinator requests.

use crate::configuration::save_user_settings;
use crate::controller::{Controller, RefreshMsg, UpdateCredentialsMsg};
use crate::coordinator::{DataUpdated, RequestRefresh, UpdateCredentials};
use crate::errors::ServiceError;
use actix::{ActorFutureExt, Handler, ResponseActFuture, ResponseFuture, WrapFuture};
use log::{error, info};

impl Handler<DataUpdated> for Controller {
    type Result = ();

    fn handle(&mut self, msg: DataUpdated, _ctx: &mut Self::Context) -> Self::Result {
        self.data = msg.0;
        self.register_new_devices();
        self.update_states();
    }
}

impl Handler<RefreshMsg> for Controller {
    type Result = ResponseFuture<Result<(), ServiceError>>;

    fn handle(&mut self, _msg: RefreshMsg, _ctx: &mut Self::Context) -> Self::Result {
        let coordinator = self.coordinator.clone();
        Box::pin(async move {
            coordinator.send(RequestRefresh).await??;
            Ok::<_, ServiceError>(())
        })
    }
}

impl Handler<UpdateCredentialsMsg> for Controller {
    type Result = ResponseActFuture<Self, Result<(), ServiceError>>;

    fn handle(&mut self, msg: UpdateCredentialsMsg, _ctx: &mut Self::Context) -> Self::Result {
        let coordinator = self.coordinator.clone();
        let user_id = msg.user_id;
        let api_key = msg.api_key.trim().to_string();

        Box::pin(
            async move {
                coordinator
                    .send(UpdateCredentials {
                        user_id,
                        api_key: api_key.clone(),
                    })
                    .await??;
                Ok::<_, ServiceError>(api_key)
            }
            .into_actor(self) // converts future to ActorFuture
            .map(move |result, act, _ctx| {
                let api_key = result?;
                act.settings.user_id = user_id;
                act.settings.set_api_key(api_key);
                if let Err(e) = save_user_settings(&act.user_settings_file, &act.settings) {
                    // the running session already uses the new credentials
                    error!("New credentials are only valid until restart: {e}");
                    return Err(e);
                }
                info!("Stored new credentials for user {user_id}");
                Ok(())
            }),
        )
    }
}
