// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Actix message handlers.

mod coordinator_event;
mod cover;
mod query;
