// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tracing subscriber setup for hosts embedding the migrator.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogConfig, LogFormat};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "MODSHIM_LOG";

/// Builds the filter: `MODSHIM_LOG` if set and valid, else the configured
/// level, else `warn`.
pub fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(config: &LogConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(filter(config));
    match config.format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_falls_back_on_bad_level() {
        let config = LogConfig {
            level: "modshim=[".to_string(),
            ..Default::default()
        };
        // An invalid directive must not panic.
        let _ = filter(&config);
    }

    #[test]
    fn test_init_twice_fails() {
        let config = LogConfig::default();
        let first = init(&config);
        let second = init(&config);
        assert!(first.is_err() || second.is_err());
    }
}
