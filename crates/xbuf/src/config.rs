// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide entry point table.
//!
//! Every wrapper operation goes through an [`EntryPoints`] table: the
//! per-kind constructors, `wrap`, the accessors and `destroy`.
//! The table is installed once (usually with [`configure_native`]) and
//! copied into each wrapper at construction, so reconfiguring later never
//! changes how an existing container is torn down.

use libc::c_void;
use parking_lot::RwLock;
use xbuf_c::{ElementKind, XbufContainer, XbufError};

use crate::{Error, Result};

/// Allocates a zero-filled container of one kind.
pub type Constructor = unsafe extern "C" fn(usize) -> *mut XbufContainer;
/// Wraps caller memory: `(data, nitems, dtype tag, is_mutable, out_handle)`.
pub type WrapFn =
    unsafe extern "C" fn(*mut c_void, usize, u32, bool, *mut *mut XbufContainer) -> XbufError;
pub type DestroyFn = unsafe extern "C" fn(*mut XbufContainer) -> XbufError;
pub type LivenessFn = unsafe extern "C" fn(*const XbufContainer) -> bool;
pub type SizeFn = unsafe extern "C" fn(*const XbufContainer) -> usize;
pub type TagFn = unsafe extern "C" fn(*const XbufContainer) -> u32;
pub type FlagFn = unsafe extern "C" fn(*const XbufContainer) -> bool;
pub type DataFn = unsafe extern "C" fn(*const XbufContainer) -> *mut c_void;

/// One constructor per element kind.
#[derive(Debug, Clone, Copy)]
pub struct Constructors {
    pub int8: Constructor,
    pub int32: Constructor,
    pub int64: Constructor,
    pub uint8: Constructor,
    pub uint32: Constructor,
    pub uint64: Constructor,
    pub uintp: Constructor,
    pub float32: Constructor,
    pub float64: Constructor,
}

impl Constructors {
    pub fn for_kind(&self, kind: ElementKind) -> Constructor {
        match kind {
            ElementKind::Int8 => self.int8,
            ElementKind::Int32 => self.int32,
            ElementKind::Int64 => self.int64,
            ElementKind::Unsigned8 => self.uint8,
            ElementKind::Unsigned32 => self.uint32,
            ElementKind::Unsigned64 => self.uint64,
            ElementKind::Usize => self.uintp,
            ElementKind::Float32 => self.float32,
            ElementKind::Float64 => self.float64,
        }
    }
}

/// The native functions a wrapper calls.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoints {
    pub constructors: Constructors,
    pub wrap: WrapFn,
    pub destroy: DestroyFn,
    pub is_live: LivenessFn,
    pub get_nitems: SizeFn,
    pub get_capacity: SizeFn,
    pub get_itemsize: SizeFn,
    pub get_dtype: TagFn,
    pub get_is_mutable: FlagFn,
    pub get_is_owner: FlagFn,
    pub get_data: DataFn,
}

impl EntryPoints {
    /// The table exported by `xbuf-c`, linked into this process.
    pub fn native() -> Self {
        Self {
            constructors: Constructors {
                int8: xbuf_c::xbuf_container_new_i8,
                int32: xbuf_c::xbuf_container_new_i32,
                int64: xbuf_c::xbuf_container_new_i64,
                uint8: xbuf_c::xbuf_container_new_u8,
                uint32: xbuf_c::xbuf_container_new_u32,
                uint64: xbuf_c::xbuf_container_new_u64,
                uintp: xbuf_c::xbuf_container_new_usize,
                float32: xbuf_c::xbuf_container_new_f32,
                float64: xbuf_c::xbuf_container_new_f64,
            },
            wrap: xbuf_c::xbuf_container_wrap,
            destroy: xbuf_c::xbuf_container_destroy,
            is_live: xbuf_c::xbuf_container_is_live,
            get_nitems: xbuf_c::xbuf_container_get_nitems,
            get_capacity: xbuf_c::xbuf_container_get_capacity,
            get_itemsize: xbuf_c::xbuf_container_get_itemsize,
            get_dtype: xbuf_c::xbuf_container_get_dtype,
            get_is_mutable: xbuf_c::xbuf_container_get_is_mutable,
            get_is_owner: xbuf_c::xbuf_container_get_is_owner,
            get_data: xbuf_c::xbuf_container_get_data,
        }
    }
}

struct State {
    entry_points: Option<EntryPoints>,
    max_alloc_bytes: Option<usize>,
}

static STATE: RwLock<State> = parking_lot::const_rwlock(State {
    entry_points: None,
    max_alloc_bytes: None,
});

/// Install the entry point table. Replaces any previous table; wrappers
/// already built keep the one they were created with.
pub fn configure(entry_points: EntryPoints) {
    let mut state = STATE.write();
    if state.entry_points.is_some() {
        log::debug!("[xbuf] replacing configured entry points");
    }
    state.entry_points = Some(entry_points);
}

/// Install [`EntryPoints::native`].
pub fn configure_native() {
    configure(EntryPoints::native());
}

pub fn is_configured() -> bool {
    STATE.read().entry_points.is_some()
}

/// The current table, or [`Error::NotConfigured`].
pub fn entry_points() -> Result<EntryPoints> {
    STATE.read().entry_points.ok_or(Error::NotConfigured)
}

/// Cap the byte size of a single [`Wrapper::allocate`](crate::Wrapper::allocate).
/// `None` removes the cap.
pub fn set_max_alloc_bytes(limit: Option<usize>) {
    STATE.write().max_alloc_bytes = limit;
}

pub fn max_alloc_bytes() -> Option<usize> {
    STATE.read().max_alloc_bytes
}

pub(crate) fn check_alloc_bytes(bytes: usize) -> Result<()> {
    match max_alloc_bytes() {
        Some(limit) if bytes > limit => {
            log::warn!(
                "[xbuf] refusing allocation of {} bytes (limit {})",
                bytes,
                limit
            );
            Err(Error::AllocationFailure { bytes })
        }
        _ => Ok(()),
    }
}
