// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the owning side.
//!
//! [`Error`] is what the Rust API returns; [`XbufError`] is the C-compatible
//! status code every fallible entry point hands back across the boundary.

use thiserror::Error as ThisError;

use crate::dtype::ElementKind;

/// Errors raised by the type registry and the container core.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Presentation name or native tag outside the closed set of kinds.
    #[error("unknown element kind: {0}")]
    UnknownKind(String),
    /// The allocator could not provide the requested buffer.
    #[error("allocation of {bytes} bytes failed")]
    AllocationFailure { bytes: usize },
    /// `nitems * itemsize` overflows or exceeds the allocator's limit.
    #[error("invalid size: {nitems} items of {itemsize} bytes")]
    InvalidSize { nitems: usize, itemsize: usize },
    /// Write attempted on a container that is not mutable.
    #[error("write attempted on an immutable buffer")]
    ImmutableBufferWrite,
    /// Operation on a handle whose container was already destroyed.
    #[error("container used after destroy")]
    UseAfterDestroy,
    /// Null data pointer supplied for a non-empty buffer.
    #[error("null data pointer for a non-empty buffer")]
    NullPointer,
    /// Data pointer not aligned for the element kind.
    #[error("pointer {addr:#x} is not aligned to {align} bytes")]
    MisalignedPointer { addr: usize, align: usize },
    /// Typed access with a Rust type that does not match the container's kind.
    #[error("dtype mismatch: container holds {actual}, requested {expected}")]
    DtypeMismatch {
        expected: ElementKind,
        actual: ElementKind,
    },
    /// Ownership-transferring operation on a borrowed buffer.
    #[error("container does not own its buffer")]
    NotOwner,
}

/// Convenient alias for owning-side results.
pub type Result<T> = core::result::Result<T, Error>;

/// Error codes (C-compatible enum)
///
/// # Error Code Categories
///
/// - **0-9**: Success and generic errors
/// - **10-19**: Type registry errors
/// - **20-29**: Memory errors
/// - **30-39**: Access and lifecycle errors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XbufError {
    /// Operation completed successfully
    XbufOk = 0,
    /// Invalid argument provided (null pointer, invalid value)
    XbufInvalidArgument = 1,
    /// One-time setup (such as the logger) was already done
    XbufAlreadyInitialized = 2,

    // === Type registry errors (10-19) ===
    /// Native tag or presentation name is not a known element kind
    XbufUnknownKind = 10,
    /// Typed access does not match the container's element kind
    XbufDtypeMismatch = 11,

    // === Memory errors (20-29) ===
    /// Buffer allocation failed
    XbufAllocationFailure = 20,
    /// Byte size computation overflowed
    XbufInvalidSize = 21,
    /// Data pointer is not aligned for the element kind
    XbufMisalignedPointer = 22,
    /// Null data pointer for a non-empty buffer
    XbufNullPointer = 23,

    // === Access and lifecycle errors (30-39) ===
    /// Write attempted on an immutable buffer
    XbufImmutableBufferWrite = 30,
    /// Handle refers to a destroyed (or never created) container
    XbufUseAfterDestroy = 31,
    /// Container does not own its buffer
    XbufNotOwner = 32,
}

impl From<&Error> for XbufError {
    fn from(err: &Error) -> Self {
        match err {
            Error::UnknownKind(_) => XbufError::XbufUnknownKind,
            Error::AllocationFailure { .. } => XbufError::XbufAllocationFailure,
            Error::InvalidSize { .. } => XbufError::XbufInvalidSize,
            Error::ImmutableBufferWrite => XbufError::XbufImmutableBufferWrite,
            Error::UseAfterDestroy => XbufError::XbufUseAfterDestroy,
            Error::NullPointer => XbufError::XbufNullPointer,
            Error::MisalignedPointer { .. } => XbufError::XbufMisalignedPointer,
            Error::DtypeMismatch { .. } => XbufError::XbufDtypeMismatch,
            Error::NotOwner => XbufError::XbufNotOwner,
        }
    }
}

impl From<Error> for XbufError {
    fn from(err: Error) -> Self {
        XbufError::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(XbufError::XbufOk as i32, 0);
        assert_eq!(XbufError::XbufAlreadyInitialized as i32, 2);
        assert_eq!(XbufError::XbufUnknownKind as i32, 10);
        assert_eq!(XbufError::XbufAllocationFailure as i32, 20);
        assert_eq!(XbufError::XbufNullPointer as i32, 23);
        assert_eq!(XbufError::XbufUseAfterDestroy as i32, 31);
    }

    #[test]
    fn rust_errors_map_to_codes() {
        assert_eq!(
            XbufError::from(Error::UnknownKind("bool".into())),
            XbufError::XbufUnknownKind
        );
        assert_eq!(
            XbufError::from(Error::NullPointer),
            XbufError::XbufNullPointer
        );
        assert_eq!(
            XbufError::from(Error::InvalidSize {
                nitems: usize::MAX,
                itemsize: 8
            }),
            XbufError::XbufInvalidSize
        );
    }

    #[test]
    fn display_names_the_offending_value() {
        let err = Error::UnknownKind("complex128".into());
        assert_eq!(err.to_string(), "unknown element kind: complex128");

        let err = Error::MisalignedPointer { addr: 0x11, align: 4 };
        assert_eq!(err.to_string(), "pointer 0x11 is not aligned to 4 bytes");
    }
}
