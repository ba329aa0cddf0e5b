// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Local fake Sunsa cloud API for actor and HTTP tests.

use crate::api::{DeviceId, SunsaClient};
use crate::coordinator::{Coordinator, CoordinatorData, GetData};
use actix::Addr;
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

pub const USER_ID: u32 = 42;
pub const API_KEY: &str = "test-api-key";

#[derive(Default)]
struct FakeState {
    api_key: String,
    devices: Vec<Value>,
    fail_status: Option<u16>,
    /// Response delay of the next device list request
    delay_next: Option<Duration>,
    device_requests: usize,
    updates: Vec<(DeviceId, i32)>,
}

type SharedState = Arc<Mutex<FakeState>>;

pub struct FakeSunsa {
    pub url: Url,
    state: SharedState,
}

impl FakeSunsa {
    /// Start a fake API server on a random local port.
    pub fn start(devices: Vec<Value>) -> Self {
        let state = Arc::new(Mutex::new(FakeState {
            api_key: API_KEY.into(),
            devices,
            ..Default::default()
        }));
        let data = web::Data::new(state.clone());

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route(
                    "/api/public/{user_id}/devices",
                    web::get().to(get_devices),
                )
                .route(
                    "/api/public/{user_id}/devices/{device_id}",
                    web::put().to(update_device),
                )
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind fake Sunsa server");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        Self {
            url: Url::parse(&format!("http://{addr}/api/public/")).expect("valid url"),
            state,
        }
    }

    /// API client with valid credentials.
    pub fn client(&self) -> SunsaClient {
        SunsaClient::new(awc::Client::default(), self.url.clone(), USER_ID, API_KEY)
    }

    /// Let all API requests fail with the given HTTP status.
    pub fn fail_with(&self, status: Option<u16>) {
        self.lock().fail_status = status;
    }

    /// Delay the response of the next device list request.
    pub fn delay_next_request(&self, delay: Duration) {
        self.lock().delay_next = Some(delay);
    }

    /// Accept only the given API key from now on.
    pub fn set_api_key(&self, api_key: &str) {
        self.lock().api_key = api_key.into();
    }

    pub fn device_requests(&self) -> usize {
        self.lock().device_requests
    }

    pub fn position_updates(&self) -> Vec<(DeviceId, i32)> {
        self.lock().updates.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state lock")
    }
}

/// Device record in the Sunsa API format.
pub fn sunsa_device(id: DeviceId, name: &str, position: i32) -> Value {
    json!({
        "idDevice": id,
        "name": name,
        "position": position,
        "isConnected": true,
        "defaultSmartHomeDirection": { "value": 0, "text": "Left" },
        "blindType": { "value": 1, "text": "Vertical" },
        "batteryPercentage": 80,
        "temperature": { "value": 71.6 }
    })
}

/// Wait until the coordinator completed its first update.
pub async fn wait_for_update(addr: &Addr<Coordinator>) -> Arc<CoordinatorData> {
    for _ in 0..250 {
        let data = addr.send(GetData).await.expect("coordinator mailbox");
        if data.last_update.is_some() {
            return data;
        }
        actix_web::rt::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("coordinator didn't complete an update");
}

/// Wait until the fake server received at least `count` device list requests.
pub async fn wait_for_device_requests(fake: &FakeSunsa, count: usize) {
    for _ in 0..250 {
        if fake.device_requests() >= count {
            return;
        }
        actix_web::rt::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("fake server didn't receive {count} device requests");
}

fn authorized(req: &HttpRequest, user_id: u32, state: &FakeState) -> bool {
    let api_key = req
        .headers()
        .get("X-Auth-Token")
        .and_then(|v| v.to_str().ok());
    user_id == USER_ID && api_key == Some(state.api_key.as_str())
}

async fn get_devices(
    req: HttpRequest,
    path: web::Path<u32>,
    state: web::Data<SharedState>,
) -> HttpResponse {
    let delay = {
        let mut state = state.lock().expect("fake state lock");
        state.device_requests += 1;
        state.delay_next.take()
    };
    if let Some(delay) = delay {
        actix_web::rt::time::sleep(delay).await;
    }

    let state = state.lock().expect("fake state lock");
    if let Some(status) = state.fail_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return HttpResponse::build(status).body("simulated failure");
    }
    if !authorized(&req, path.into_inner(), &state) {
        return HttpResponse::Unauthorized().body("Invalid API key");
    }

    HttpResponse::Ok().json(json!({ "devices": state.devices }))
}

async fn update_device(
    req: HttpRequest,
    path: web::Path<(u32, DeviceId)>,
    body: web::Json<Value>,
    state: web::Data<SharedState>,
) -> HttpResponse {
    let (user_id, device_id) = path.into_inner();
    let mut state = state.lock().expect("fake state lock");
    if let Some(status) = state.fail_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return HttpResponse::build(status).body("simulated failure");
    }
    if !authorized(&req, user_id, &state) {
        return HttpResponse::Unauthorized().body("Invalid API key");
    }
    let Some(position) = body.get("Position").and_then(Value::as_i64) else {
        return HttpResponse::BadRequest().body("Missing Position");
    };

    let Some(device) = state
        .devices
        .iter_mut()
        .find(|d| d["idDevice"].as_u64() == Some(u64::from(device_id)))
    else {
        return HttpResponse::NotFound().finish();
    };
    device["position"] = json!(position);
    state.updates.push((device_id, position as i32));

    HttpResponse::Ok().json(json!({ "device": { "idDevice": device_id } }))
}
