// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! REST API exposing the entity states, cover commands and integration services.

mod web_model;

pub use web_model::*;

use crate::configuration::IntegrationSettings;
use crate::controller::{
    Controller, CoverCommandMsg, GetEntityState, GetEntityStates, GetStatus, IntegrationStatus,
    RefreshMsg, SetAbsolutePosition, UpdateCredentialsMsg,
};
use crate::entity::{CoverCommand, EntityState};
use crate::errors::ServiceError;
use actix::Addr;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, HttpResponse, get, post, put, web};
use futures::future::{Ready, ready};
use log::warn;

/// Request header with the optional shared API token.
pub const AUTH_HEADER: &str = "auth-token";

/// Request guard checking the `auth-token` header if a token is configured.
pub struct Authenticated;

impl FromRequest for Authenticated {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = req
            .app_data::<web::Data<IntegrationSettings>>()
            .and_then(|settings| settings.token.as_deref());
        let Some(token) = token else {
            return ready(Ok(Authenticated));
        };

        let auth_token = req
            .headers()
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok());
        if auth_token == Some(token) {
            ready(Ok(Authenticated))
        } else {
            warn!("Unauthorized request from {:?}", req.peer_addr());
            ready(Err(ServiceError::AuthenticationFailed(
                "Invalid or missing auth-token".into(),
            )))
        }
    }
}

fn ok_response(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::new("OK", message))
}

#[get("/api/status")]
async fn get_status(
    _: Authenticated,
    controller: web::Data<Addr<Controller>>,
) -> Result<web::Json<IntegrationStatus>, ServiceError> {
    Ok(web::Json(controller.send(GetStatus).await?))
}

#[get("/api/entities")]
async fn get_entities(
    _: Authenticated,
    controller: web::Data<Addr<Controller>>,
) -> Result<web::Json<Vec<EntityState>>, ServiceError> {
    Ok(web::Json(controller.send(GetEntityStates).await?))
}

#[get("/api/entities/{entity_id}")]
async fn get_entity(
    _: Authenticated,
    path: web::Path<String>,
    controller: web::Data<Addr<Controller>>,
) -> Result<web::Json<EntityState>, ServiceError> {
    let entity_id = path.into_inner();
    Ok(web::Json(
        controller.send(GetEntityState { entity_id }).await??,
    ))
}

async fn cover_command(
    controller: &Addr<Controller>,
    entity_id: String,
    command: CoverCommand,
) -> Result<HttpResponse, ServiceError> {
    controller
        .send(CoverCommandMsg { entity_id, command })
        .await??;
    Ok(ok_response("Command sent"))
}

#[post("/api/covers/{entity_id}/open")]
async fn open_cover(
    _: Authenticated,
    path: web::Path<String>,
    controller: web::Data<Addr<Controller>>,
) -> Result<HttpResponse, ServiceError> {
    cover_command(&controller, path.into_inner(), CoverCommand::Open).await
}

#[post("/api/covers/{entity_id}/close")]
async fn close_cover(
    _: Authenticated,
    path: web::Path<String>,
    controller: web::Data<Addr<Controller>>,
) -> Result<HttpResponse, ServiceError> {
    cover_command(&controller, path.into_inner(), CoverCommand::Close).await
}

#[put("/api/covers/{entity_id}/position")]
async fn set_cover_position(
    _: Authenticated,
    path: web::Path<String>,
    body: web::Json<CoverPosition>,
    controller: web::Data<Addr<Controller>>,
) -> Result<HttpResponse, ServiceError> {
    let command = CoverCommand::SetPosition(body.position);
    cover_command(&controller, path.into_inner(), command).await
}

#[post("/api/services/set_absolute_position")]
async fn set_absolute_position(
    _: Authenticated,
    body: web::Json<AbsolutePositionRequest>,
    controller: web::Data<Addr<Controller>>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    controller
        .send(SetAbsolutePosition {
            entity_ids: body.entity_id,
            position: body.position,
        })
        .await??;
    Ok(ok_response("Command sent"))
}

#[post("/api/refresh")]
async fn refresh(
    _: Authenticated,
    controller: web::Data<Addr<Controller>>,
) -> Result<HttpResponse, ServiceError> {
    controller.send(RefreshMsg).await??;
    Ok(ok_response("Devices refreshed"))
}

#[put("/api/credentials")]
async fn update_credentials(
    _: Authenticated,
    body: web::Json<CredentialsRequest>,
    controller: web::Data<Addr<Controller>>,
) -> Result<HttpResponse, ServiceError> {
    let body = body.into_inner();
    if body.user_id == 0 || body.api_key.trim().is_empty() {
        return Err(ServiceError::BadRequest(
            "user_id and api_key are required".into(),
        ));
    }
    controller
        .send(UpdateCredentialsMsg {
            user_id: body.user_id,
            api_key: body.api_key,
        })
        .await??;
    Ok(ok_response("Credentials updated"))
}

/// Register all REST API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_status)
        .service(get_entities)
        .service(get_entity)
        .service(open_cover)
        .service(close_cover)
        .service(set_cover_position)
        .service(set_absolute_position)
        .service(refresh)
        .service(update_credentials);
}
