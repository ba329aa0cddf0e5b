// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

use std::env;
use std::ffi::OsStr;

/// Retrieves a boolean flag from the given environment variable.
///
/// `true`, `yes` and `1` are considered true, ignoring case. Everything else, including a
/// missing variable, is false.
pub fn bool_from_env<K: AsRef<OsStr>>(key: K) -> bool {
    env::var(key).map(|v| is_truthy(&v)).unwrap_or_default()
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::is_truthy;
    use rstest::rstest;

    #[rstest]
    #[case("1", true)]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case(" yes ", true)]
    #[case("0", false)]
    #[case("false", false)]
    #[case("", false)]
    #[case("on", false)]
    fn truthy_values(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(expected, is_truthy(value));
    }
}
