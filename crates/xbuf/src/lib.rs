// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Safe Rust wrappers around xbuf containers.
//!
//! A [`Wrapper`] takes an opaque `XbufContainer*` handle, reads its metadata
//! through the configured entry points and hands out zero-copy [`View`]s over
//! the buffer. The container is destroyed exactly once, when the wrapper is
//! dropped or [`Wrapper::close`]d.
//!
//! The entry point table must be installed before any wrapper is built:
//!
//! ```rust,no_run
//! xbuf::configure_native();
//!
//! let mut wrapper = xbuf::Wrapper::allocate(4, "int32")?;
//! wrapper.write_slice(&[1i32, 2, 3, 4])?;
//! assert_eq!(wrapper.to_vec::<i32>()?, vec![1, 2, 3, 4]);
//! # Ok::<(), xbuf::Error>(())
//! ```

pub mod config;
pub mod env_config;
pub mod registry;
pub mod view;
mod wrapper;

pub use config::{configure, configure_native, entry_points, is_configured, EntryPoints};
pub use env_config::EnvConfig;
pub use registry::{kind_for, kind_info, presentation_name};
pub use view::{ArrayMut, ArrayRef, View, ViewMut};
pub use wrapper::{ContainerInfo, Wrapper};
pub use xbuf_c::{Element, ElementKind, KindInfo, XbufContainer, XbufError};

use std::sync::Once;

use thiserror::Error;

/// Errors emitted by the safe wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("entry points not configured")]
    NotConfigured,
    #[error("unknown element kind: {0}")]
    UnknownKind(String),
    #[error("allocation of {bytes} bytes failed")]
    AllocationFailure { bytes: usize },
    #[error("invalid size: {nitems} items of {itemsize} bytes")]
    InvalidSize { nitems: usize, itemsize: usize },
    #[error("write attempted on an immutable buffer")]
    ImmutableBufferWrite,
    #[error("container used after destroy")]
    UseAfterDestroy,
    #[error("null pointer")]
    NullPointer,
    #[error("pointer {addr:#x} is not aligned to {align} bytes")]
    MisalignedPointer { addr: usize, align: usize },
    #[error("dtype mismatch: container holds {actual}, requested {expected}")]
    DtypeMismatch {
        expected: ElementKind,
        actual: ElementKind,
    },
    #[error("itemsize mismatch: {dtype} is {} bytes, native side reported {reported}", .dtype.itemsize())]
    ItemsizeMismatch { dtype: ElementKind, reported: usize },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("container does not own its buffer")]
    NotOwner,
    #[error("native call failed: {0:?}")]
    Native(XbufError),
}

/// Convenient alias for wrapper results.
pub type Result<T> = core::result::Result<T, Error>;

impl From<xbuf_c::Error> for Error {
    fn from(err: xbuf_c::Error) -> Self {
        match err {
            xbuf_c::Error::UnknownKind(what) => Self::UnknownKind(what),
            xbuf_c::Error::AllocationFailure { bytes } => Self::AllocationFailure { bytes },
            xbuf_c::Error::InvalidSize { nitems, itemsize } => {
                Self::InvalidSize { nitems, itemsize }
            }
            xbuf_c::Error::ImmutableBufferWrite => Self::ImmutableBufferWrite,
            xbuf_c::Error::UseAfterDestroy => Self::UseAfterDestroy,
            xbuf_c::Error::NullPointer => Self::NullPointer,
            xbuf_c::Error::MisalignedPointer { addr, align } => {
                Self::MisalignedPointer { addr, align }
            }
            xbuf_c::Error::DtypeMismatch { expected, actual } => {
                Self::DtypeMismatch { expected, actual }
            }
            xbuf_c::Error::NotOwner => Self::NotOwner,
        }
    }
}

impl Error {
    fn from_xbuf(err: XbufError) -> Self {
        match err {
            XbufError::XbufUseAfterDestroy => Self::UseAfterDestroy,
            XbufError::XbufImmutableBufferWrite => Self::ImmutableBufferWrite,
            XbufError::XbufNotOwner => Self::NotOwner,
            XbufError::XbufNullPointer => Self::NullPointer,
            other => Self::Native(other),
        }
    }
}

fn map_status(err: XbufError) -> Result<()> {
    match err {
        XbufError::XbufOk => Ok(()),
        other => Err(Error::from_xbuf(other)),
    }
}

static INIT: Once = Once::new();

/// One-time process setup from the environment.
///
/// Reads [`EnvConfig`], initializes logging, applies the allocation ceiling
/// and installs the native entry points. Later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let env = EnvConfig::from_env();
        env.apply_log_level();
        env.init_logging();

        config::set_max_alloc_bytes(env.max_alloc_bytes);
        config::configure_native();

        if env.is_custom() {
            log::info!(
                "[xbuf] environment config: log_level={}, max_alloc_bytes={:?}",
                env.log_level,
                env.max_alloc_bytes
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(map_status(XbufError::XbufOk), Ok(()));
        assert_eq!(
            map_status(XbufError::XbufUseAfterDestroy),
            Err(Error::UseAfterDestroy)
        );
        assert_eq!(
            map_status(XbufError::XbufAllocationFailure),
            Err(Error::Native(XbufError::XbufAllocationFailure))
        );
    }

    #[test]
    fn owning_side_errors_convert() {
        let err: Error = xbuf_c::Error::UnknownKind("bool".into()).into();
        assert_eq!(err, Error::UnknownKind("bool".into()));
        assert_eq!(err.to_string(), "unknown element kind: bool");
    }

    #[test]
    fn itemsize_mismatch_message() {
        let err = Error::ItemsizeMismatch {
            dtype: ElementKind::Int64,
            reported: 4,
        };
        assert_eq!(
            err.to_string(),
            "itemsize mismatch: int64 is 8 bytes, native side reported 4"
        );
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        assert!(is_configured());
    }
}
