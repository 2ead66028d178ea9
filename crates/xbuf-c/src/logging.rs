// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logger setup shared by the C ABI and the Rust wrappers.
//!
//! Filters built from a level are scoped to the xbuf crates, so installing
//! the xbuf logger never turns on logging for the rest of the host process.

use std::ffi::CStr;
use std::os::raw::c_char;

use log::LevelFilter;

use crate::error::XbufError;

/// Crates whose records a level-based filter enables.
const XBUF_TARGETS: [&str; 2] = ["xbuf_c", "xbuf"];

/// Log level for xbuf logging
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XbufLogLevel {
    XbufLogOff = 0,
    XbufLogError = 1,
    XbufLogWarn = 2,
    XbufLogInfo = 3,
    XbufLogDebug = 4,
    XbufLogTrace = 5,
}

impl From<XbufLogLevel> for LevelFilter {
    fn from(level: XbufLogLevel) -> Self {
        match level {
            XbufLogLevel::XbufLogOff => LevelFilter::Off,
            XbufLogLevel::XbufLogError => LevelFilter::Error,
            XbufLogLevel::XbufLogWarn => LevelFilter::Warn,
            XbufLogLevel::XbufLogInfo => LevelFilter::Info,
            XbufLogLevel::XbufLogDebug => LevelFilter::Debug,
            XbufLogLevel::XbufLogTrace => LevelFilter::Trace,
        }
    }
}

/// `env_logger` filter enabling `level` for the xbuf crates only,
/// e.g. `"xbuf_c=debug,xbuf=debug"`.
pub fn scoped_filter(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    XBUF_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the process logger.
///
/// With `honour_env`, a `RUST_LOG` setting replaces `default_filter`.
///
/// # Returns
/// `XbufOk`, or `XbufAlreadyInitialized` if a logger is already installed
/// (the existing one is kept).
pub fn init_logger(default_filter: &str, honour_env: bool) -> XbufError {
    let mut builder = if honour_env {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
    } else {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(default_filter);
        builder
    };

    match builder.format_timestamp_millis().format_target(true).try_init() {
        Ok(()) => {
            log::debug!("[xbuf] logger installed ({})", default_filter);
            XbufError::XbufOk
        }
        Err(_) => XbufError::XbufAlreadyInitialized,
    }
}

/// Log xbuf records at `level` to stderr. `RUST_LOG` is ignored.
///
/// # Returns
/// `XbufOk`, or `XbufAlreadyInitialized` if a logger is already installed.
///
/// # Example (C)
/// ```c
/// xbuf_logging_init(XBUF_LOG_INFO);
/// ```
#[no_mangle]
pub extern "C" fn xbuf_logging_init(level: XbufLogLevel) -> XbufError {
    init_logger(&scoped_filter(level.into()), false)
}

/// Like [`xbuf_logging_init`], but a `RUST_LOG` setting takes precedence.
#[no_mangle]
pub extern "C" fn xbuf_logging_init_env(default_level: XbufLogLevel) -> XbufError {
    init_logger(&scoped_filter(default_level.into()), true)
}

/// Install a logger with a raw `env_logger` filter string
/// (e.g. `"xbuf_c=trace,warn"`).
///
/// # Safety
/// - `filter` must be a valid null-terminated C string or NULL.
///
/// # Returns
/// `XbufInvalidArgument` for NULL or non-UTF-8 input, otherwise as
/// [`xbuf_logging_init`].
#[no_mangle]
pub unsafe extern "C" fn xbuf_logging_init_with_filter(filter: *const c_char) -> XbufError {
    if filter.is_null() {
        return XbufError::XbufInvalidArgument;
    }

    match CStr::from_ptr(filter).to_str() {
        Ok(filter) => init_logger(filter, false),
        Err(_) => XbufError::XbufInvalidArgument,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping() {
        assert_eq!(LevelFilter::from(XbufLogLevel::XbufLogOff), LevelFilter::Off);
        assert_eq!(
            LevelFilter::from(XbufLogLevel::XbufLogDebug),
            LevelFilter::Debug
        );
    }

    #[test]
    fn filter_is_scoped_to_xbuf() {
        assert_eq!(scoped_filter(LevelFilter::Debug), "xbuf_c=debug,xbuf=debug");
        assert_eq!(scoped_filter(LevelFilter::Off), "xbuf_c=off,xbuf=off");
    }

    #[test]
    fn second_install_reports_already_initialized() {
        let first = xbuf_logging_init(XbufLogLevel::XbufLogWarn);
        assert!(matches!(
            first,
            XbufError::XbufOk | XbufError::XbufAlreadyInitialized
        ));
        assert_eq!(
            xbuf_logging_init_env(XbufLogLevel::XbufLogInfo),
            XbufError::XbufAlreadyInitialized
        );
        let filter = c"xbuf_c=trace";
        assert_eq!(
            unsafe { xbuf_logging_init_with_filter(filter.as_ptr()) },
            XbufError::XbufAlreadyInitialized
        );
    }

    #[test]
    fn null_filter_is_rejected() {
        let ret = unsafe { xbuf_logging_init_with_filter(std::ptr::null()) };
        assert_eq!(ret, XbufError::XbufInvalidArgument);
    }
}
