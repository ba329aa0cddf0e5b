// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Sunsa cloud API data model.

use serde::{Deserialize, Serialize};

/// Sunsa device identifier (`idDevice`).
pub type DeviceId = u32;

/// Response of the device list request.
#[derive(Debug, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub devices: Vec<Device>,
}

/// Device state record as returned by the Sunsa API.
///
/// Only `idDevice` is mandatory, everything else depends on the device model and firmware.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id_device: DeviceId,
    #[serde(default)]
    pub name: Option<String>,
    /// Absolute blind position: 0 = open, -100 / 100 = closed in either direction.
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub default_smart_home_direction: Option<LabeledValue>,
    #[serde(default)]
    pub blind_type: Option<LabeledValue>,
    #[serde(default)]
    pub battery_percentage: Option<u8>,
    #[serde(default)]
    pub temperature: Option<Measurement>,
}

/// Enumeration value with a display text, e.g. `{"value": 1, "text": "Right"}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LabeledValue {
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Measurement {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Request body to reposition a blind.
#[derive(Debug, Serialize)]
pub struct PositionUpdate {
    #[serde(rename = "Position")]
    pub position: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_with_all_fields_is_parsed() {
        let device: Device = serde_json::from_value(json!({
            "idDevice": 1234,
            "name": "Living room",
            "position": -60,
            "isConnected": true,
            "defaultSmartHomeDirection": { "value": 1, "text": "Right" },
            "blindType": { "value": 2, "text": "Horizontal" },
            "batteryPercentage": 87,
            "temperature": { "value": 71.6, "unit": "F" },
            "someNewField": "ignored"
        }))
        .expect("valid device json");

        assert_eq!(1234, device.id_device);
        assert_eq!(Some("Living room".into()), device.name);
        assert_eq!(Some(-60), device.position);
        assert!(device.is_connected);
        assert_eq!(
            Some("Right"),
            device
                .default_smart_home_direction
                .as_ref()
                .and_then(|d| d.text.as_deref())
        );
        assert_eq!(Some(87), device.battery_percentage);
        assert_eq!(
            Some(71.6),
            device.temperature.as_ref().and_then(|t| t.value)
        );
    }

    #[test]
    fn device_with_only_id_uses_defaults() {
        let device: Device = serde_json::from_value(json!({ "idDevice": 7 })).unwrap();

        assert_eq!(7, device.id_device);
        assert_eq!(None, device.position);
        assert!(!device.is_connected, "missing isConnected must be false");
        assert!(device.blind_type.is_none());
    }

    #[test]
    fn device_list_without_devices_is_empty() {
        let list: DeviceList = serde_json::from_value(json!({})).unwrap();
        assert!(list.devices.is_empty());
    }

    #[test]
    fn position_update_uses_capitalized_field() {
        let body = serde_json::to_value(PositionUpdate { position: -30 }).unwrap();
        assert_eq!(json!({ "Position": -30 }), body);
    }
}
