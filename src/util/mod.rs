// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Common utility functions.

mod env;
mod network;

pub use env::*;
pub use network::*;

/// Convert a display name into an entity id object id.
///
/// Lower-cases the name, replaces every run of non alphanumeric characters with a single `_`
/// and trims leading and trailing underscores. Returns `None` if nothing is left.
pub fn slugify(name: &str) -> Option<String> {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}
