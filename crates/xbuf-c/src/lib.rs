// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # xbuf C ABI
//!
//! Owning side of the xbuf protocol: typed numeric containers allocated (or
//! wrapped) here and read or written in place by a consumer on the other side
//! of a C ABI.
//!
//! A container crosses the boundary as an opaque `XbufContainer*` handle plus
//! a fixed set of entry points:
//!
//! - constructors: `xbuf_container_new_<kind>`, `xbuf_container_new`,
//!   `xbuf_container_wrap`, `xbuf_container_new_from_pointer`
//! - destructor: `xbuf_container_destroy`
//! - accessors: `xbuf_container_get_{nitems,capacity,itemsize,dtype,
//!   is_mutable,is_owner,data}` and `xbuf_container_is_live`
//!
//! Handles are ids into a table of live containers, so a destroyed handle is
//! detected rather than dereferenced.
//!
//! # Safety
//!
//! Functions taking raw data or out-pointers are `unsafe` and document the
//! invariants the caller must uphold, as is `xbuf_container_destroy`, which
//! frees memory views may still point into. Accessors accept any handle
//! value.

mod container;
mod dtype;
mod error;
mod handles;
mod logging;

pub use container::{DataContainer, Mutability, Ownership};
pub use dtype::{check_element, kind_info, Element, ElementKind, KindInfo, XBUF_DTYPE_INVALID};
pub use error::{Error, Result, XbufError};
pub use handles::{into_handle, take_handle};
pub use logging::*;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

use libc::c_void;

/// Opaque handle to a container
#[repr(C)]
pub struct XbufContainer {
    _private: [u8; 0],
}

fn new_container(nitems: usize, dtype: ElementKind) -> *mut XbufContainer {
    match DataContainer::allocate(nitems, dtype) {
        Ok(container) => handles::insert(container),
        Err(err) => {
            log::warn!("[xbuf] new {} x {} failed: {}", nitems, dtype, err);
            ptr::null_mut()
        }
    }
}

fn dead_handle<T>(op: &str, handle: *const XbufContainer, fallback: T) -> T {
    log::error!("[xbuf] {} on dead handle {:p}", op, handle);
    fallback
}

macro_rules! c_new_container {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Create a zero-filled `", stringify!($ty), "` container of `nitems` elements.")]
            ///
            /// The container owns its buffer and is mutable.
            ///
            /// # Returns
            /// Opaque handle, or NULL if the size overflows or allocation fails.
            /// Release with `xbuf_container_destroy`.
            #[no_mangle]
            pub extern "C" fn $name(nitems: usize) -> *mut XbufContainer {
                new_container(nitems, <$ty as Element>::KIND)
            }
        )*
    };
}

c_new_container! {
    xbuf_container_new_i8 => i8,
    xbuf_container_new_i32 => i32,
    xbuf_container_new_i64 => i64,
    xbuf_container_new_u8 => u8,
    xbuf_container_new_u32 => u32,
    xbuf_container_new_u64 => u64,
    xbuf_container_new_usize => usize,
    xbuf_container_new_f32 => f32,
    xbuf_container_new_f64 => f64,
}

/// Create a zero-filled container for a native dtype tag.
///
/// # Safety
/// - `out_handle` must be a valid pointer to write the result.
///
/// # Returns
/// `XbufOk` with `*out_handle` set, or an error code with `*out_handle` NULL.
#[no_mangle]
pub unsafe extern "C" fn xbuf_container_new(
    nitems: usize,
    dtype: u32,
    out_handle: *mut *mut XbufContainer,
) -> XbufError {
    if out_handle.is_null() {
        return XbufError::XbufInvalidArgument;
    }
    out_handle.write(ptr::null_mut());

    let result = ElementKind::try_from(dtype).and_then(|kind| DataContainer::allocate(nitems, kind));
    match result {
        Ok(container) => {
            out_handle.write(handles::insert(container));
            XbufError::XbufOk
        }
        Err(err) => {
            log::warn!("[xbuf] new {} x tag {} failed: {}", nitems, dtype, err);
            err.into()
        }
    }
}

unsafe fn wrap_container(
    data: *mut c_void,
    nitems: usize,
    dtype: u32,
    is_mutable: bool,
) -> Result<*mut XbufContainer> {
    let kind = ElementKind::try_from(dtype)?;
    let container = DataContainer::wrap(data, nitems, kind, is_mutable.into())?;
    Ok(handles::insert(container))
}

/// Wrap caller-owned memory in a non-owning container, reporting why a
/// wrap was refused.
///
/// # Safety
/// - `data` must point to at least `nitems * itemsize(dtype)` bytes, writable
///   if `is_mutable` is true.
/// - The memory must stay valid until the container is destroyed. This cannot
///   be checked.
/// - `out_handle` must be a valid pointer to write the result.
///
/// # Returns
/// `XbufOk` with `*out_handle` set, or with `*out_handle` NULL one of
/// `XbufUnknownKind`, `XbufInvalidSize`, `XbufNullPointer` (NULL `data`
/// with `nitems > 0`), `XbufMisalignedPointer`, `XbufInvalidArgument`
/// (NULL `out_handle`).
#[no_mangle]
pub unsafe extern "C" fn xbuf_container_wrap(
    data: *mut c_void,
    nitems: usize,
    dtype: u32,
    is_mutable: bool,
    out_handle: *mut *mut XbufContainer,
) -> XbufError {
    if out_handle.is_null() {
        return XbufError::XbufInvalidArgument;
    }
    out_handle.write(ptr::null_mut());

    match wrap_container(data, nitems, dtype, is_mutable) {
        Ok(handle) => {
            out_handle.write(handle);
            XbufError::XbufOk
        }
        Err(err) => {
            log::warn!("[xbuf] wrap {:p} ({} x tag {}) failed: {}", data, nitems, dtype, err);
            err.into()
        }
    }
}

/// Wrap caller-owned memory in a non-owning container.
///
/// # Safety
/// As for [`xbuf_container_wrap`], without `out_handle`.
///
/// # Returns
/// Opaque handle, or NULL on any failure `xbuf_container_wrap` reports.
#[no_mangle]
pub unsafe extern "C" fn xbuf_container_new_from_pointer(
    data: *mut c_void,
    nitems: usize,
    dtype: u32,
    is_mutable: bool,
) -> *mut XbufContainer {
    let mut handle = ptr::null_mut();
    xbuf_container_wrap(data, nitems, dtype, is_mutable, &mut handle);
    handle
}

/// Destroy a container. Owned buffers are released; borrowed buffers are not
/// touched.
///
/// # Safety
/// - No reference into the container's buffer may be alive. In particular,
///   `handle` must not be owned by a live `xbuf::Wrapper`: release it through
///   the wrapper instead.
///
/// ```compile_fail
/// let handle = xbuf_c::xbuf_container_new_i32(4);
/// xbuf_c::xbuf_container_destroy(handle); // requires `unsafe`
/// ```
///
/// # Returns
/// `XbufOk` (also for NULL, which is a no-op), or `XbufUseAfterDestroy` if the
/// handle is not live. A rejected destroy has no effect.
#[no_mangle]
pub unsafe extern "C" fn xbuf_container_destroy(handle: *mut XbufContainer) -> XbufError {
    if handle.is_null() {
        return XbufError::XbufOk;
    }

    match handles::remove(handle) {
        Some(container) => {
            log::debug!(
                "[xbuf] destroy {:p} ({} x {}, owner={})",
                handle,
                container.nitems(),
                container.dtype(),
                container.is_owner()
            );
            drop(container);
            XbufError::XbufOk
        }
        None => {
            log::warn!("[xbuf] destroy rejected: {:p} is not live", handle);
            XbufError::XbufUseAfterDestroy
        }
    }
}

/// Whether `handle` refers to a live container.
#[no_mangle]
pub extern "C" fn xbuf_container_is_live(handle: *const XbufContainer) -> bool {
    handles::is_live(handle)
}

/// Number of valid elements, or 0 for a dead handle.
#[no_mangle]
pub extern "C" fn xbuf_container_get_nitems(handle: *const XbufContainer) -> usize {
    handles::with(handle, DataContainer::nitems)
        .unwrap_or_else(|| dead_handle("get_nitems", handle, 0))
}

/// Allocated element slots, or 0 for a dead handle.
#[no_mangle]
pub extern "C" fn xbuf_container_get_capacity(handle: *const XbufContainer) -> usize {
    handles::with(handle, DataContainer::capacity)
        .unwrap_or_else(|| dead_handle("get_capacity", handle, 0))
}

/// Bytes per element, or 0 for a dead handle.
#[no_mangle]
pub extern "C" fn xbuf_container_get_itemsize(handle: *const XbufContainer) -> usize {
    handles::with(handle, DataContainer::itemsize)
        .unwrap_or_else(|| dead_handle("get_itemsize", handle, 0))
}

/// Native dtype tag, or `XBUF_DTYPE_INVALID` for a dead handle.
#[no_mangle]
pub extern "C" fn xbuf_container_get_dtype(handle: *const XbufContainer) -> u32 {
    handles::with(handle, |c| c.dtype().tag())
        .unwrap_or_else(|| dead_handle("get_dtype", handle, XBUF_DTYPE_INVALID))
}

/// Whether views may write, or false for a dead handle.
#[no_mangle]
pub extern "C" fn xbuf_container_get_is_mutable(handle: *const XbufContainer) -> bool {
    handles::with(handle, DataContainer::is_mutable)
        .unwrap_or_else(|| dead_handle("get_is_mutable", handle, false))
}

/// Whether the container releases its buffer, or false for a dead handle.
#[no_mangle]
pub extern "C" fn xbuf_container_get_is_owner(handle: *const XbufContainer) -> bool {
    handles::with(handle, DataContainer::is_owner)
        .unwrap_or_else(|| dead_handle("get_is_owner", handle, false))
}

/// Address of the first element, or NULL for a dead handle.
///
/// The address stays valid until the container is destroyed (and, for a
/// wrapped buffer, while the caller's memory is alive).
#[no_mangle]
pub extern "C" fn xbuf_container_get_data(handle: *const XbufContainer) -> *mut c_void {
    handles::with(handle, DataContainer::data_ptr)
        .unwrap_or_else(|| dead_handle("get_data", handle, ptr::null_mut()))
}

/// Bytes per element for a native dtype tag, or 0 if the tag is unknown.
#[no_mangle]
pub extern "C" fn xbuf_dtype_itemsize(dtype: u32) -> usize {
    ElementKind::try_from(dtype).map_or(0, ElementKind::itemsize)
}

/// Presentation name for a native dtype tag, or NULL if the tag is unknown.
///
/// The returned string has static storage.
#[no_mangle]
pub extern "C" fn xbuf_dtype_name(dtype: u32) -> *const c_char {
    let Ok(kind) = ElementKind::try_from(dtype) else {
        return ptr::null();
    };

    let name: &'static CStr = match kind {
        ElementKind::Float32 => c"float32",
        ElementKind::Float64 => c"float64",
        ElementKind::Int8 => c"int8",
        ElementKind::Int32 => c"int32",
        ElementKind::Int64 => c"int64",
        ElementKind::Unsigned8 => c"uint8",
        ElementKind::Unsigned32 => c"uint32",
        ElementKind::Unsigned64 => c"uint64",
        ElementKind::Usize => c"uintp",
    };
    name.as_ptr()
}

/// Get xbuf library version string
///
/// # Safety
/// The returned pointer is valid for the lifetime of the process (static storage).
#[no_mangle]
pub unsafe extern "C" fn xbuf_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr().cast::<c_char>()
}
