// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Sensor entity specific logic.

use crate::api::{Device, DeviceId};
use crate::coordinator::CoordinatorData;
use crate::entity::{EntityBase, EntityState, EntityType};
use serde_json::{Map, Value};

pub const UNIT_PERCENTAGE: &str = "%";
pub const UNIT_FAHRENHEIT: &str = "°F";
pub const UNIT_CELSIUS: &str = "°C";

/// Static description of a sensor projecting a single device field.
#[derive(Debug)]
pub struct SensorDescription {
    /// Sunsa device field name.
    pub key: &'static str,
    pub translation_key: &'static str,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub entity_category: Option<&'static str>,
    pub suggested_display_precision: Option<u8>,
    /// Unit of measurement for the given device.
    pub unit_fn: fn(&Device) -> Option<&'static str>,
    /// Sensor state for the given device. `Value::Null` if unknown.
    pub state_fn: fn(&Device) -> Value,
}

pub static SENSORS: [SensorDescription; 4] = [
    SensorDescription {
        key: "batteryPercentage",
        translation_key: "battery_level",
        device_class: Some("battery"),
        state_class: Some("measurement"),
        entity_category: None,
        suggested_display_precision: None,
        unit_fn: |_| Some(UNIT_PERCENTAGE),
        state_fn: |d| d.battery_percentage.map(Value::from).unwrap_or_default(),
    },
    SensorDescription {
        key: "temperature",
        translation_key: "temperature",
        device_class: Some("temperature"),
        state_class: Some("measurement"),
        entity_category: None,
        suggested_display_precision: Some(0),
        unit_fn: temperature_unit,
        state_fn: |d| {
            d.temperature
                .as_ref()
                .and_then(|t| t.value)
                .map(Value::from)
                .unwrap_or_default()
        },
    },
    SensorDescription {
        key: "defaultSmartHomeDirection",
        translation_key: "default_smart_home_direction",
        device_class: None,
        state_class: None,
        entity_category: Some("diagnostic"),
        suggested_display_precision: None,
        unit_fn: |_| None,
        state_fn: |d| {
            d.default_smart_home_direction
                .as_ref()
                .and_then(|v| v.text.as_deref())
                .map(|text| Value::from(text.to_lowercase()))
                .unwrap_or_default()
        },
    },
    SensorDescription {
        key: "blindType",
        translation_key: "blind_type",
        device_class: None,
        state_class: None,
        entity_category: Some("diagnostic"),
        suggested_display_precision: None,
        unit_fn: |_| None,
        state_fn: |d| {
            d.blind_type
                .as_ref()
                .and_then(|v| v.text.as_deref())
                .map(Value::from)
                .unwrap_or_default()
        },
    },
];

/// The API reports Fahrenheit unless the device unit says otherwise.
fn temperature_unit(device: &Device) -> Option<&'static str> {
    let unit = device.temperature.as_ref().and_then(|t| t.unit.as_deref());
    match unit.map(|u| u.trim().trim_start_matches('°')) {
        Some(u) if u.eq_ignore_ascii_case("c") || u.eq_ignore_ascii_case("celsius") => {
            Some(UNIT_CELSIUS)
        }
        _ => Some(UNIT_FAHRENHEIT),
    }
}

/// Read-only sensor of a single Sunsa device field.
#[derive(Debug, Clone)]
pub struct SensorEntity {
    pub(crate) base: EntityBase,
    description: &'static SensorDescription,
}

impl SensorEntity {
    pub fn new(
        device_id: DeviceId,
        device_name: &str,
        description: &'static SensorDescription,
    ) -> Self {
        Self {
            base: EntityBase::new(
                EntityType::Sensor,
                device_id,
                device_name,
                description.key,
                Some(description.translation_key),
            ),
            description,
        }
    }

    pub fn base(&self) -> &EntityBase {
        &self.base
    }

    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }

    pub fn state(&self, data: &CoordinatorData) -> EntityState {
        let device = self.base.device(data);
        let state = device
            .map(|d| (self.description.state_fn)(d))
            .unwrap_or_default();

        let mut attributes = Map::with_capacity(4);
        attributes.insert(
            "translation_key".into(),
            self.description.translation_key.into(),
        );
        if let Some(unit) = device.and_then(|d| (self.description.unit_fn)(d)) {
            attributes.insert("unit_of_measurement".into(), unit.into());
        }
        if let Some(state_class) = self.description.state_class {
            attributes.insert("state_class".into(), state_class.into());
        }
        if let Some(precision) = self.description.suggested_display_precision {
            attributes.insert("suggested_display_precision".into(), precision.into());
        }

        self.base.new_state(
            data,
            self.description.device_class,
            self.description.entity_category,
            state,
            attributes,
        )
    }
}
