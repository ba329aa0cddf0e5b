// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

pub mod api;
pub mod controller;
pub mod coordinator;
pub mod entity;
pub mod server;
pub mod util;

pub mod configuration;
pub mod errors;
pub mod startup;

#[cfg(test)]
mod test_support;

pub use controller::*;
pub use startup::*;
