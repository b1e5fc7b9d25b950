//! Full configuration validation.
//!
//! Validates numeric ranges and free-form strings, collecting every
//! problem into a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::DeskletConfig;
use desklet_common::ConfigError;

use helpers::{validate_non_empty, validate_range_u64};

/// Maximum grace period for backend termination steps.
const MAX_GRACE_MS: u64 = 60_000;

/// Maximum state write coalescing window.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &DeskletConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_range_u64(
        &mut errors,
        "backend.shutdown_grace_ms",
        config.backend.shutdown_grace_ms,
        0,
        MAX_GRACE_MS,
    );
    validate_range_u64(
        &mut errors,
        "backend.kill_grace_ms",
        config.backend.kill_grace_ms,
        0,
        MAX_GRACE_MS,
    );
    validate_range_u64(
        &mut errors,
        "state.save_debounce_ms",
        config.state.save_debounce_ms,
        0,
        MAX_DEBOUNCE_MS,
    );
    validate_non_empty(&mut errors, "host.theme", &config.host.theme);
    validate_non_empty(&mut errors, "host.locale", &config.host.locale);

    for (i, dir) in config.paths.widget_dirs.iter().enumerate() {
        if dir.as_os_str().is_empty() {
            errors.push(format!("paths.widget_dirs[{i}] is empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
