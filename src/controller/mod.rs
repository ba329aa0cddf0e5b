// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Central controller owning all entities and handling REST API requests.

mod handler;
mod messages;

pub use messages::*;

use crate::api::DeviceId;
use crate::configuration::{SunsaSettings, user_settings_path};
use crate::coordinator::{Coordinator, CoordinatorData, Subscribe};
use crate::entity::{EntityState, SunsaEntity, build_entities, device_name};
use crate::errors::ServiceError;
use actix::prelude::{Actor, Context};
use actix::{Addr, AsyncContext};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

pub struct Controller {
    settings: SunsaSettings,
    /// Storage location of credentials updated at runtime
    user_settings_file: PathBuf,
    coordinator: Addr<Coordinator>,
    /// Latest coordinator data
    data: Arc<CoordinatorData>,
    /// All entities by entity id
    entities: BTreeMap<String, SunsaEntity>,
    known_devices: HashSet<DeviceId>,
    /// Last computed entity states by entity id
    states: HashMap<String, EntityState>,
}

impl Controller {
    pub fn new(settings: SunsaSettings, coordinator: Addr<Coordinator>) -> Self {
        Self {
            settings,
            user_settings_file: user_settings_path(),
            coordinator,
            data: Default::default(),
            entities: Default::default(),
            known_devices: Default::default(),
            states: Default::default(),
        }
    }

    /// Store credentials updated at runtime in the given file instead of the default location.
    pub fn with_user_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_settings_file = path.into();
        self
    }

    /// Create the entities of all devices seen for the first time.
    ///
    /// Entities are never removed: a device missing in an update becomes unavailable.
    fn register_new_devices(&mut self) {
        let mut new_devices: Vec<_> = self
            .data
            .devices
            .values()
            .filter(|d| !self.known_devices.contains(&d.id_device))
            .collect();
        if new_devices.is_empty() {
            return;
        }
        // stable entity ids for duplicate device names
        new_devices.sort_by_key(|d| d.id_device);

        for device in new_devices {
            let mut sensors = 0;
            for mut entity in build_entities(device) {
                entity.ensure_unique_id(|id| self.entities.contains_key(id));
                if matches!(entity, SunsaEntity::Sensor(_)) {
                    sensors += 1;
                }
                debug!("Adding entity {}", entity.entity_id());
                self.entities.insert(entity.entity_id().to_string(), entity);
            }
            info!(
                "Registered {sensors} sensors and a cover for {}",
                device_name(device)
            );
            self.known_devices.insert(device.id_device);
        }
    }

    /// Recompute all entity states and log the changed ones.
    fn update_states(&mut self) {
        for (entity_id, entity) in &self.entities {
            let state = entity.state(&self.data);
            if self.states.get(entity_id) == Some(&state) {
                continue;
            }
            debug!(
                "{entity_id} changed: state={}, available={}",
                state.state, state.available
            );
            self.states.insert(entity_id.clone(), state);
        }
    }

    fn entity_state(&self, entity_id: &str) -> Result<EntityState, ServiceError> {
        self.states
            .get(entity_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Entity {entity_id} not found")))
    }
}

impl Actor for Controller {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        debug!("Controller started");
        self.coordinator
            .do_send(Subscribe(ctx.address().recipient()));
    }
}
