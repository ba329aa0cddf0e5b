// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Cover entity specific logic.
//!
//! The Sunsa API reports an absolute blind position in the range `-100..=100`:
//! `0` is fully open, `-100` and `100` are fully closed in either tilt direction. Which sign is
//! used for closing depends on the mounting orientation, configured per device as the
//! "default smart home direction".
//!
//! Covers use the percent-open convention: `0` = closed, `100` = open.

use crate::api::{Device, DeviceId};
use crate::coordinator::CoordinatorData;
use crate::entity::{EntityBase, EntityState, EntityType};
use crate::errors::ServiceError;
use serde_json::{Map, Value};
use std::str::FromStr;
use strum::{AsRefStr, EnumString};

/// Absolute position of a fully opened blind.
pub const OPEN_POSITION: i32 = 0;
/// Absolute position magnitude of a fully closed blind.
pub const CLOSED_POSITION: i32 = 100;

pub const ATTR_CURRENT_POSITION: &str = "current_position";
pub const ATTR_CURRENT_ABSOLUTE_POSITION: &str = "current_absolute_position";
pub const ATTR_DEFAULT_CLOSED_POSITION: &str = "default_closed_position";
pub const ATTR_FULLY_OPEN: &str = "fully_open";

pub const COVER_FEATURES: [&str; 3] = ["open", "close", "set_position"];

/// Device orientation setting selecting the closing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SmartHomeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SmartHomeDirection {
    /// Sign of the absolute position when closing: `1` or `-1`.
    pub fn closing_sign(self) -> i32 {
        match self {
            SmartHomeDirection::Right | SmartHomeDirection::Up => 1,
            SmartHomeDirection::Left | SmartHomeDirection::Down => -1,
        }
    }
}

/// Closing direction of the given device: `1` or `-1`.
///
/// Devices without a known default smart home direction close in negative direction.
pub fn closing_direction(device: &Device) -> i32 {
    device
        .default_smart_home_direction
        .as_ref()
        .and_then(|d| d.text.as_deref())
        .and_then(|text| SmartHomeDirection::from_str(text.trim()).ok())
        .map(SmartHomeDirection::closing_sign)
        .unwrap_or(-1)
}

fn magnitude(absolute: i32) -> i32 {
    absolute.saturating_abs().min(CLOSED_POSITION)
}

/// Percent-open cover position of an absolute blind position.
pub fn percent_open(absolute: i32) -> u8 {
    (CLOSED_POSITION - magnitude(absolute)) as u8
}

pub fn is_closed(absolute: i32) -> bool {
    magnitude(absolute) == CLOSED_POSITION
}

pub fn is_open(absolute: i32) -> bool {
    absolute == OPEN_POSITION
}

/// Absolute position to issue for a percent-open cover position.
///
/// # Arguments
///
/// * `percent`: target position, 0 = closed, 100 = open.
/// * `direction`: closing direction of the device, `1` or `-1`.
/// * `step`: round the absolute magnitude to a multiple of this step. `1` disables rounding.
pub fn absolute_position(percent: u8, direction: i32, step: u8) -> Result<i32, ServiceError> {
    if percent > 100 {
        return Err(ServiceError::BadRequest(format!(
            "Invalid position {percent}: valid range is 0..100"
        )));
    }
    let magnitude = CLOSED_POSITION - i32::from(percent);
    // fully closed must stay at the end position, independent of the step
    let magnitude = if magnitude == CLOSED_POSITION {
        magnitude
    } else {
        round_to_step(magnitude, step)
    };
    Ok(magnitude * direction.signum())
}

/// Round to the nearest multiple of `step`, halves are rounded up.
pub fn round_to_step(value: i32, step: u8) -> i32 {
    let step = i32::from(step.max(1));
    (((value + step / 2) / step) * step).min(CLOSED_POSITION)
}

/// Validate a raw absolute position for the `set_absolute_position` service.
pub fn validate_absolute_position(position: i32) -> Result<i32, ServiceError> {
    if (-CLOSED_POSITION..=CLOSED_POSITION).contains(&position) {
        Ok(position)
    } else {
        Err(ServiceError::BadRequest(format!(
            "Invalid absolute position {position}: valid range is -100..100"
        )))
    }
}

/// Cover commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverCommand {
    Open,
    Close,
    /// Move to a percent-open position.
    SetPosition(u8),
}

/// Sunsa blind as cover entity.
#[derive(Debug, Clone)]
pub struct CoverEntity {
    pub(crate) base: EntityBase,
}

impl CoverEntity {
    pub fn new(device_id: DeviceId, device_name: &str) -> Self {
        Self {
            base: EntityBase::new(EntityType::Cover, device_id, device_name, "cover", None),
        }
    }

    pub fn base(&self) -> &EntityBase {
        &self.base
    }

    /// Absolute position closing the blind in its default direction.
    pub fn default_closed_position(device: &Device) -> i32 {
        CLOSED_POSITION * closing_direction(device)
    }

    /// Absolute position to issue for the given command.
    pub fn target_position(
        device: &Device,
        command: CoverCommand,
        step: u8,
    ) -> Result<i32, ServiceError> {
        match command {
            CoverCommand::Open => Ok(OPEN_POSITION),
            CoverCommand::Close => Ok(Self::default_closed_position(device)),
            CoverCommand::SetPosition(percent) => {
                absolute_position(percent, closing_direction(device), step)
            }
        }
    }

    pub fn state(&self, data: &CoordinatorData) -> EntityState {
        let device = self.base.device(data);
        let absolute = device.and_then(|d| d.position);

        let state = match absolute {
            Some(p) if is_closed(p) => Value::from("closed"),
            Some(_) => Value::from("open"),
            None => Value::Null,
        };

        let mut attributes = Map::with_capacity(6);
        if let Some(p) = absolute {
            attributes.insert(ATTR_CURRENT_POSITION.into(), percent_open(p).into());
            attributes.insert(ATTR_CURRENT_ABSOLUTE_POSITION.into(), p.into());
            attributes.insert(ATTR_FULLY_OPEN.into(), is_open(p).into());
        }
        if let Some(device) = device {
            attributes.insert(
                ATTR_DEFAULT_CLOSED_POSITION.into(),
                Self::default_closed_position(device).into(),
            );
        }
        attributes.insert("supported_features".into(), COVER_FEATURES.to_vec().into());

        self.base
            .new_state(data, Some("blind"), None, state, attributes)
    }
}
