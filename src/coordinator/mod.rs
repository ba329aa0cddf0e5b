// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Polling coordinator: periodically fetches all device states from the Sunsa API and fans them
//! out to the subscribed listeners.

mod handler;
mod messages;

pub use messages::*;

use crate::api::{ApiError, Device, DeviceId, SunsaClient};
use crate::errors::ServiceError;
use actix::prelude::{Actor, Context, Recipient};
use actix::dev::SendError;
use actix::{AsyncContext, SpawnHandle};
use derive_more::Display;
use futures::channel::oneshot;
use log::{debug, error, info, warn};
use rust_fsm::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

state_machine! {
    derive(Debug, Clone, Copy, PartialEq, Eq)
    pub CoordinatorMode(Initializing)

    Initializing => {
        UpdateSucceeded => Available,
        UpdateFailed => Unavailable [Failing],
        AuthFailed => ReauthRequired [StopPolling],
    },
    Available => {
        UpdateSucceeded => Available,
        UpdateFailed => Unavailable [Failing],
        AuthFailed => ReauthRequired [StopPolling],
    },
    Unavailable => {
        UpdateSucceeded => Available [Recovered],
        UpdateFailed => Unavailable,
        AuthFailed => ReauthRequired [StopPolling],
    },
    ReauthRequired(CredentialsUpdated) => Initializing,
}

impl CoordinatorModeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorModeState::Initializing => "initializing",
            CoordinatorModeState::Available => "available",
            CoordinatorModeState::Unavailable => "unavailable",
            CoordinatorModeState::ReauthRequired => "reauth_required",
        }
    }
}

/// Classified update failure.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum UpdateError {
    /// The API rejected the credentials. Polling stops until new credentials are provided.
    #[display("Authentication failed: {_0}")]
    AuthFailed(String),
    #[display("Error communicating with API: {_0}")]
    UpdateFailed(String),
}

impl std::error::Error for UpdateError {}

impl From<ApiError> for UpdateError {
    fn from(e: ApiError) -> Self {
        if e.is_auth_error() {
            UpdateError::AuthFailed(e.to_string())
        } else {
            UpdateError::UpdateFailed(e.to_string())
        }
    }
}

impl From<UpdateError> for ServiceError {
    fn from(e: UpdateError) -> Self {
        match e {
            UpdateError::AuthFailed(msg) => ServiceError::AuthenticationFailed(msg),
            UpdateError::UpdateFailed(msg) => ServiceError::ServiceUnavailable(msg),
        }
    }
}

/// Snapshot of the latest polling result.
///
/// A new snapshot is created for every update. The device map is replaced wholesale on success
/// and kept as is on failure.
#[derive(Debug, Clone)]
pub struct CoordinatorData {
    pub devices: HashMap<DeviceId, Device>,
    pub last_update_success: bool,
    pub last_error: Option<UpdateError>,
    /// Time of the last completed update, successful or not.
    pub last_update: Option<SystemTime>,
    pub mode: CoordinatorModeState,
}

impl Default for CoordinatorData {
    fn default() -> Self {
        Self {
            devices: HashMap::new(),
            last_update_success: false,
            last_error: None,
            last_update: None,
            mode: CoordinatorModeState::Initializing,
        }
    }
}

impl CoordinatorData {
    /// Data of a successful update with the given devices.
    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: devices.into_iter().map(|d| (d.id_device, d)).collect(),
            last_update_success: true,
            last_error: None,
            last_update: Some(SystemTime::now()),
            mode: CoordinatorModeState::Available,
        }
    }
}

pub struct Coordinator {
    client: SunsaClient,
    update_interval: Duration,
    data: Arc<CoordinatorData>,
    machine: StateMachine<CoordinatorMode>,
    listeners: Vec<Recipient<DataUpdated>>,
    /// Device request in progress
    refreshing: bool,
    /// Refresh requests waiting for the result of the running device request
    refresh_waiters: Vec<oneshot::Sender<Result<(), UpdateError>>>,
    /// Incremented whenever the client credentials are replaced
    credentials_generation: u64,
    /// Next scheduled refresh
    poll_handle: Option<SpawnHandle>,
}

impl Coordinator {
    pub fn new(client: SunsaClient, update_interval: Duration) -> Self {
        Self {
            client,
            update_interval,
            data: Default::default(),
            machine: StateMachine::new(),
            listeners: Vec::new(),
            refreshing: false,
            refresh_waiters: Vec::new(),
            credentials_generation: 0,
            poll_handle: None,
        }
    }

    fn polling_stopped(&self) -> bool {
        matches!(self.machine.state(), CoordinatorModeState::ReauthRequired)
    }

    /// Schedule the next refresh, replacing an already scheduled one.
    fn schedule_refresh(&mut self, ctx: &mut Context<Self>) {
        self.cancel_refresh(ctx);
        if self.polling_stopped() {
            return;
        }
        self.poll_handle = Some(ctx.run_later(self.update_interval, |_, ctx| {
            ctx.notify(RequestRefresh);
        }));
    }

    fn cancel_refresh(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.poll_handle.take() {
            ctx.cancel_future(handle);
        }
    }

    /// Result of the last completed update.
    fn last_result(&self) -> Result<(), UpdateError> {
        match &self.data.last_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn resolve_refresh_waiters(&mut self, result: &Result<(), UpdateError>) {
        for waiter in self.refresh_waiters.drain(..) {
            let _ = waiter.send(result.clone());
        }
    }

    /// Apply a device request result, advance the mode state machine and notify all listeners.
    fn apply_update(&mut self, result: Result<Vec<Device>, ApiError>) -> Result<(), UpdateError> {
        let mut data = CoordinatorData::clone(&self.data);
        data.last_update = Some(SystemTime::now());

        let (input, result) = match result {
            Ok(devices) => {
                debug!("Fetched {} devices", devices.len());
                data.devices = devices.into_iter().map(|d| (d.id_device, d)).collect();
                data.last_update_success = true;
                data.last_error = None;
                (CoordinatorModeInput::UpdateSucceeded, Ok(()))
            }
            Err(e) => {
                let e = UpdateError::from(e);
                let input = match e {
                    UpdateError::AuthFailed(_) => CoordinatorModeInput::AuthFailed,
                    UpdateError::UpdateFailed(_) => CoordinatorModeInput::UpdateFailed,
                };
                data.last_update_success = false;
                data.last_error = Some(e.clone());
                (input, Err(e))
            }
        };

        match self.machine.consume(&input) {
            Ok(Some(CoordinatorModeOutput::Failing)) => {
                if let Err(e) = &result {
                    error!("Sunsa API is unavailable: {e}");
                }
            }
            Ok(Some(CoordinatorModeOutput::StopPolling)) => {
                error!("Sunsa API rejected the credentials, polling stopped until re-authentication");
            }
            Ok(Some(CoordinatorModeOutput::Recovered)) => info!("Sunsa API is available again"),
            Ok(None) => {}
            Err(_) => warn!(
                "Ignoring update result {input:?} in mode {:?}",
                self.machine.state()
            ),
        }
        data.mode = *self.machine.state();

        self.data = Arc::new(data);
        self.notify_listeners();

        result
    }

    fn notify_listeners(&mut self) {
        let data = self.data.clone();
        self.listeners
            .retain(|listener| match listener.try_send(DataUpdated(data.clone())) {
                Ok(_) => true,
                Err(SendError::Full(_)) => {
                    warn!("Listener mailbox full, dropping data update");
                    true
                }
                Err(SendError::Closed(_)) => {
                    debug!("Removing closed listener");
                    false
                }
            });
    }
}

impl Actor for Coordinator {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        debug!(
            "Coordinator started for user {}, polling every {}s",
            self.client.user_id(),
            self.update_interval.as_secs()
        );
        ctx.notify(RequestRefresh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        API_KEY, FakeSunsa, USER_ID, sunsa_device, wait_for_device_requests, wait_for_update,
    };
    use rstest::rstest;

    fn coordinator(fake: &FakeSunsa) -> actix::Addr<Coordinator> {
        Coordinator::new(fake.client(), Duration::from_secs(60)).start()
    }

    #[rstest]
    #[case(ApiError::Http { status: 401, message: "".into() }, true)]
    #[case(ApiError::Http { status: 403, message: "".into() }, false)]
    #[case(ApiError::Http { status: 500, message: "".into() }, false)]
    #[case(ApiError::Timeout, false)]
    #[case(ApiError::Connection("refused".into()), false)]
    #[case(ApiError::InvalidResponse("eof".into()), false)]
    fn only_401_is_classified_as_auth_failure(#[case] error: ApiError, #[case] auth: bool) {
        assert_eq!(
            auth,
            matches!(UpdateError::from(error), UpdateError::AuthFailed(_))
        );
    }

    #[test]
    fn mode_transitions() {
        let mut machine: StateMachine<CoordinatorMode> = StateMachine::new();
        assert_eq!(
            Ok(Some(CoordinatorModeOutput::Failing)),
            machine.consume(&CoordinatorModeInput::UpdateFailed).map_err(|_| ())
        );
        assert_eq!(
            Ok(None),
            machine.consume(&CoordinatorModeInput::UpdateFailed).map_err(|_| ())
        );
        assert_eq!(
            Ok(Some(CoordinatorModeOutput::Recovered)),
            machine.consume(&CoordinatorModeInput::UpdateSucceeded).map_err(|_| ())
        );
        assert_eq!(
            Ok(Some(CoordinatorModeOutput::StopPolling)),
            machine.consume(&CoordinatorModeInput::AuthFailed).map_err(|_| ())
        );
        assert!(machine.consume(&CoordinatorModeInput::UpdateSucceeded).is_err());
        assert!(machine.consume(&CoordinatorModeInput::CredentialsUpdated).is_ok());
        assert_eq!(&CoordinatorModeState::Initializing, machine.state());
    }

    #[actix_web::test]
    async fn successful_update_replaces_devices() {
        let fake = FakeSunsa::start(vec![
            sunsa_device(1, "Bedroom", -100),
            sunsa_device(2, "Office", 0),
        ]);
        let addr = coordinator(&fake);

        let data = wait_for_update(&addr).await;

        assert!(data.last_update_success);
        assert_eq!(CoordinatorModeState::Available, data.mode);
        assert_eq!(2, data.devices.len());
        assert_eq!(Some(-100), data.devices[&1].position);
        assert!(data.last_error.is_none());
    }

    #[actix_web::test]
    async fn http_401_requires_reauthentication() {
        let fake = FakeSunsa::start(vec![sunsa_device(1, "Bedroom", 0)]);
        let client = fake.client().with_credentials(USER_ID, "wrong-key");
        let addr = Coordinator::new(client, Duration::from_secs(60)).start();

        let data = wait_for_update(&addr).await;

        assert!(!data.last_update_success);
        assert_eq!(CoordinatorModeState::ReauthRequired, data.mode);
        assert!(matches!(data.last_error, Some(UpdateError::AuthFailed(_))));

        // polling is stopped: further refresh requests don't hit the API
        let requests = fake.device_requests();
        let result = addr.send(RequestRefresh).await.unwrap();
        assert!(matches!(result, Err(UpdateError::AuthFailed(_))));
        assert_eq!(requests, fake.device_requests());
    }

    #[actix_web::test]
    async fn server_error_keeps_previous_devices() {
        let fake = FakeSunsa::start(vec![sunsa_device(1, "Bedroom", 40)]);
        let addr = coordinator(&fake);
        wait_for_update(&addr).await;

        fake.fail_with(Some(500));
        let result = addr.send(RequestRefresh).await.unwrap();
        assert!(matches!(result, Err(UpdateError::UpdateFailed(_))));

        let data = addr.send(GetData).await.unwrap();
        assert!(!data.last_update_success);
        assert_eq!(CoordinatorModeState::Unavailable, data.mode);
        assert_eq!(Some(40), data.devices[&1].position);

        fake.fail_with(None);
        assert_eq!(Ok(()), addr.send(RequestRefresh).await.unwrap());
        let data = addr.send(GetData).await.unwrap();
        assert!(data.last_update_success);
        assert_eq!(CoordinatorModeState::Available, data.mode);
    }

    #[actix_web::test]
    async fn position_update_is_sent_to_api() {
        let fake = FakeSunsa::start(vec![sunsa_device(1, "Bedroom", 0)]);
        let addr = coordinator(&fake);
        wait_for_update(&addr).await;

        let result = addr
            .send(UpdatePosition {
                device_id: 1,
                position: -40,
            })
            .await
            .unwrap();

        assert_eq!(Ok(()), result);
        assert_eq!(vec![(1, -40)], fake.position_updates());
    }

    #[actix_web::test]
    async fn new_credentials_resume_polling() {
        let fake = FakeSunsa::start(vec![sunsa_device(1, "Bedroom", 0)]);
        let client = fake.client().with_credentials(USER_ID, "expired-key");
        let addr = Coordinator::new(client, Duration::from_secs(60)).start();
        let data = wait_for_update(&addr).await;
        assert_eq!(CoordinatorModeState::ReauthRequired, data.mode);

        let result = addr
            .send(UpdateCredentials {
                user_id: USER_ID,
                api_key: "still-wrong".into(),
            })
            .await
            .unwrap();
        assert!(matches!(result, Err(ServiceError::AuthenticationFailed(_))));

        let result = addr
            .send(UpdateCredentials {
                user_id: USER_ID,
                api_key: API_KEY.into(),
            })
            .await
            .unwrap();
        assert_eq!(Ok(()), result);

        let data = addr.send(GetData).await.unwrap();
        assert_eq!(CoordinatorModeState::Available, data.mode);
        assert!(data.last_update_success);
        assert_eq!(1, data.devices.len());
    }

    #[actix_web::test]
    async fn concurrent_refresh_returns_result_of_running_request() {
        let fake = FakeSunsa::start(vec![sunsa_device(1, "Bedroom", 0)]);
        let addr = coordinator(&fake);
        wait_for_update(&addr).await;

        fake.delay_next_request(Duration::from_millis(300));
        let running = actix_web::rt::spawn(addr.send(RequestRefresh));
        wait_for_device_requests(&fake, 2).await;
        fake.fail_with(Some(500));

        let result = addr.send(RequestRefresh).await.unwrap();
        assert!(matches!(result, Err(UpdateError::UpdateFailed(_))));
        assert_eq!(result, running.await.unwrap().unwrap());
        assert_eq!(2, fake.device_requests());
    }

    #[actix_web::test]
    async fn refresh_with_replaced_credentials_is_discarded() {
        let fake = FakeSunsa::start(vec![sunsa_device(1, "Bedroom", 0)]);
        let addr = coordinator(&fake);
        wait_for_update(&addr).await;

        fake.delay_next_request(Duration::from_millis(300));
        let running = actix_web::rt::spawn(addr.send(RequestRefresh));
        wait_for_device_requests(&fake, 2).await;

        // old key is revoked while its device request is still running
        fake.set_api_key("rotated-key");
        let result = addr
            .send(UpdateCredentials {
                user_id: USER_ID,
                api_key: "rotated-key".into(),
            })
            .await
            .unwrap();
        assert_eq!(Ok(()), result);

        assert_eq!(Ok(()), running.await.unwrap().unwrap());
        let data = addr.send(GetData).await.unwrap();
        assert_eq!(CoordinatorModeState::Available, data.mode);
        assert!(data.last_update_success);

        // polling wasn't stopped
        assert_eq!(Ok(()), addr.send(RequestRefresh).await.unwrap());
        assert_eq!(4, fake.device_requests());
    }
}
