// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler for the coordinator messages.

use crate::api::{ApiError, validate_credentials};
use crate::coordinator::{
    Coordinator, CoordinatorModeInput, CoordinatorModeState, DataUpdated, GetData,
    RequestRefresh, Subscribe, UpdateCredentials, UpdateError, UpdatePosition,
};
use crate::errors::ServiceError;
use actix::{
    ActorFutureExt, AsyncContext, Handler, MessageResult, ResponseActFuture, WrapFuture, fut,
};
use futures::channel::oneshot;
use log::{debug, info, warn};

impl Handler<RequestRefresh> for Coordinator {
    type Result = ResponseActFuture<Self, Result<(), UpdateError>>;

    fn handle(&mut self, _msg: RequestRefresh, ctx: &mut Self::Context) -> Self::Result {
        if self.polling_stopped() {
            let error = self.data.last_error.clone().unwrap_or_else(|| {
                UpdateError::AuthFailed("re-authentication required".into())
            });
            return Box::pin(fut::ready(Err(error)));
        }
        if self.refreshing {
            debug!("Refresh already in progress, waiting for its result");
            let (tx, rx) = oneshot::channel();
            self.refresh_waiters.push(tx);
            return Box::pin(
                async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(UpdateError::UpdateFailed("refresh cancelled".into()))
                    })
                }
                .into_actor(self),
            );
        }

        self.refreshing = true;
        self.cancel_refresh(ctx);
        let client = self.client.clone();
        let generation = self.credentials_generation;

        Box::pin(
            async move { client.get_devices().await }
                .into_actor(self) // converts future to ActorFuture
                .map(move |result, act, ctx| {
                    act.refreshing = false;
                    let result = if generation == act.credentials_generation {
                        let result = act.apply_update(result);
                        act.schedule_refresh(ctx);
                        result
                    } else {
                        // credentials were replaced and validated with a newer device request
                        debug!("Discarding device update of replaced credentials");
                        act.last_result()
                    };
                    act.resolve_refresh_waiters(&result);
                    result
                }),
        )
    }
}

impl Handler<Subscribe> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _ctx: &mut Self::Context) -> Self::Result {
        if self.data.last_update.is_some() {
            msg.0.do_send(DataUpdated(self.data.clone()));
        }
        self.listeners.push(msg.0);
    }
}

impl Handler<GetData> for Coordinator {
    type Result = MessageResult<GetData>;

    fn handle(&mut self, _msg: GetData, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.data.clone())
    }
}

impl Handler<UpdatePosition> for Coordinator {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: UpdatePosition, _ctx: &mut Self::Context) -> Self::Result {
        let client = self.client.clone();

        Box::pin(
            async move { client.update_device(msg.device_id, msg.position).await }
                .into_actor(self)
                .map(|result, _act, ctx| {
                    if result.is_ok() {
                        // fetch the new position instead of waiting for the next poll
                        ctx.notify(RequestRefresh);
                    }
                    result
                }),
        )
    }
}

impl Handler<UpdateCredentials> for Coordinator {
    type Result = ResponseActFuture<Self, Result<(), ServiceError>>;

    fn handle(&mut self, msg: UpdateCredentials, _ctx: &mut Self::Context) -> Self::Result {
        let client = self.client.with_credentials(msg.user_id, msg.api_key);

        Box::pin(
            async move {
                let result = validate_credentials(&client).await;
                (client, result)
            }
            .into_actor(self)
            .map(|(client, result), act, ctx| {
                let devices = match result {
                    Ok(devices) => devices,
                    Err((category, e)) => {
                        warn!("New credentials rejected ({category}): {e}");
                        return Err(ServiceError::from(e));
                    }
                };

                info!("Credentials updated for user {}", client.user_id());
                act.client = client;
                act.credentials_generation += 1;
                if matches!(act.machine.state(), CoordinatorModeState::ReauthRequired) {
                    let _ = act.machine.consume(&CoordinatorModeInput::CredentialsUpdated);
                }
                let _ = act.apply_update(Ok(devices));
                act.schedule_refresh(ctx);
                Ok(())
            }),
        )
    }
}
