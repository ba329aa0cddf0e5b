// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Entities exposed for each Sunsa device: one cover and the diagnostic and measurement sensors.

mod cover;
mod sensor;

pub use cover::*;
pub use sensor::*;

use crate::api::{Device, DeviceId};
use crate::coordinator::CoordinatorData;
use crate::util::slugify;
use serde::Serialize;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display};

pub const DOMAIN: &str = "sunsa";
pub const MANUFACTURER: &str = "sunsa";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Cover,
    Sensor,
}

/// Device registry information shared by all entities of a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(&'static str, String)>,
    pub name: String,
    pub manufacturer: &'static str,
}

/// Computed entity state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub entity_id: String,
    pub unique_id: String,
    pub entity_type: EntityType,
    pub device_id: DeviceId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<&'static str>,
    pub available: bool,
    pub state: Value,
    pub attributes: Map<String, Value>,
    pub device_info: DeviceInfo,
}

/// Common entity properties bound to a single device.
#[derive(Debug, Clone)]
pub struct EntityBase {
    device_id: DeviceId,
    device_name: String,
    entity_type: EntityType,
    entity_id: String,
    unique_id: String,
}

impl EntityBase {
    /// Create a new entity base.
    ///
    /// # Arguments
    ///
    /// * `key`: entity key, unique per device.
    /// * `suffix`: optional entity id suffix appended to the slugified device name.
    pub fn new(
        entity_type: EntityType,
        device_id: DeviceId,
        device_name: &str,
        key: &str,
        suffix: Option<&str>,
    ) -> Self {
        let object_id = slugify(device_name).unwrap_or_else(|| format!("{DOMAIN}_{device_id}"));
        let entity_id = match suffix {
            Some(suffix) => format!("{entity_type}.{object_id}_{suffix}"),
            None => format!("{entity_type}.{object_id}"),
        };
        Self {
            device_id,
            device_name: device_name.to_string(),
            entity_type,
            entity_id,
            unique_id: format!("{device_id}-{key}"),
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Append a numeric suffix to make the entity id unique, e.g. `cover.office_2`.
    pub(crate) fn disambiguate(&mut self, counter: usize) {
        self.entity_id = format!("{}_{counter}", self.entity_id);
    }

    /// Latest device record of this entity, if still reported by the API.
    pub fn device<'a>(&self, data: &'a CoordinatorData) -> Option<&'a Device> {
        data.devices.get(&self.device_id)
    }

    pub fn available(&self, data: &CoordinatorData) -> bool {
        data.last_update_success && self.device(data).is_some_and(|d| d.is_connected)
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: vec![(DOMAIN, self.device_name.clone())],
            name: self.device_name.clone(),
            manufacturer: MANUFACTURER,
        }
    }

    pub fn new_state(
        &self,
        data: &CoordinatorData,
        device_class: Option<&'static str>,
        entity_category: Option<&'static str>,
        state: Value,
        attributes: Map<String, Value>,
    ) -> EntityState {
        EntityState {
            entity_id: self.entity_id.clone(),
            unique_id: self.unique_id.clone(),
            entity_type: self.entity_type,
            device_id: self.device_id,
            name: self.device_name.clone(),
            device_class,
            entity_category,
            available: self.available(data),
            state,
            attributes,
            device_info: self.device_info(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SunsaEntity {
    Cover(CoverEntity),
    Sensor(SensorEntity),
}

impl SunsaEntity {
    pub fn base(&self) -> &EntityBase {
        match self {
            SunsaEntity::Cover(e) => e.base(),
            SunsaEntity::Sensor(e) => e.base(),
        }
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        match self {
            SunsaEntity::Cover(e) => &mut e.base,
            SunsaEntity::Sensor(e) => &mut e.base,
        }
    }

    pub fn entity_id(&self) -> &str {
        self.base().entity_id()
    }

    pub fn state(&self, data: &CoordinatorData) -> EntityState {
        match self {
            SunsaEntity::Cover(e) => e.state(data),
            SunsaEntity::Sensor(e) => e.state(data),
        }
    }

    /// Make the entity id unique within the given set of existing entity ids.
    pub(crate) fn ensure_unique_id<F>(&mut self, exists: F)
    where
        F: Fn(&str) -> bool,
    {
        if !exists(self.entity_id()) {
            return;
        }
        let original = self.base().clone();
        for counter in 2.. {
            let mut candidate = original.clone();
            candidate.disambiguate(counter);
            if !exists(candidate.entity_id()) {
                *self.base_mut() = candidate;
                return;
            }
        }
    }
}

/// Display name of a device. Devices without a name use their identifier.
pub fn device_name(device: &Device) -> String {
    device
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("Sunsa {}", device.id_device))
}

/// Create the cover and sensor entities of a newly discovered device.
pub fn build_entities(device: &Device) -> Vec<SunsaEntity> {
    let name = device_name(device);
    let mut entities = Vec::with_capacity(1 + SENSORS.len());
    entities.push(SunsaEntity::Cover(CoverEntity::new(device.id_device, &name)));
    entities.extend(
        SENSORS
            .iter()
            .map(|d| SunsaEntity::Sensor(SensorEntity::new(device.id_device, &name, d))),
    );
    entities
}
