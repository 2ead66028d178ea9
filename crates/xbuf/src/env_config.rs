// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration.
//!
//! - `XBUF_LOG_LEVEL`: log level for the wrappers and the native side
//!   (error, warn, info, debug, trace). Default: `warn`.
//! - `XBUF_MAX_ALLOC_BYTES`: refuse single allocations larger than this many
//!   bytes. Unset or unparsable means no limit.

use std::env;

use log::LevelFilter;
use xbuf_c::XbufError;

pub const ENV_LOG_LEVEL: &str = "XBUF_LOG_LEVEL";
pub const ENV_MAX_ALLOC_BYTES: &str = "XBUF_MAX_ALLOC_BYTES";

const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub log_level: String,
    pub max_alloc_bytes: Option<usize>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            max_alloc_bytes: None,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            let level = level.trim().to_lowercase();
            if matches!(
                level.as_str(),
                "off" | "error" | "warn" | "info" | "debug" | "trace"
            ) {
                config.log_level = level;
            }
        }

        if let Ok(raw) = env::var(ENV_MAX_ALLOC_BYTES) {
            if let Ok(limit) = raw.trim().parse::<usize>() {
                config.max_alloc_bytes = Some(limit);
            }
        }

        config
    }

    pub fn is_custom(&self) -> bool {
        *self != Self::default()
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }

    /// Export the level as `RUST_LOG` unless the user already set one.
    pub fn apply_log_level(&self) {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", xbuf_c::scoped_filter(self.level_filter()));
        }
    }

    /// Install the shared xbuf logger. A logger installed earlier wins.
    pub fn init_logging(&self) {
        let filter = xbuf_c::scoped_filter(self.level_filter());
        if xbuf_c::init_logger(&filter, true) == XbufError::XbufAlreadyInitialized {
            log::debug!("[xbuf] keeping the logger already installed");
        }
    }
}
