// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::mem::{self, ManuallyDrop};
use std::ptr::NonNull;

use libc::c_void;
use serde::Serialize;
use xbuf_c::{Element, ElementKind, XbufContainer, XbufError};

use crate::config::{self, EntryPoints};
use crate::registry;
use crate::view::{View, ViewMut};
use crate::{map_status, Error, Result};

/// Metadata snapshot of a wrapped container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContainerInfo {
    pub nitems: usize,
    pub capacity: usize,
    pub itemsize: usize,
    pub dtype: ElementKind,
    pub is_mutable: bool,
    pub is_owner: bool,
}

/// Owns one container handle and destroys it exactly once.
///
/// Metadata is read through the entry points when the wrapper is built and
/// cached; the buffer itself is only reached through [`View`]s borrowed from
/// the wrapper.
pub struct Wrapper {
    handle: Option<NonNull<XbufContainer>>,
    entry_points: EntryPoints,
    info: ContainerInfo,
    data: NonNull<u8>,
}

fn dangling(dtype: ElementKind) -> NonNull<u8> {
    // align() is a non-zero power of two
    NonNull::new(dtype.align() as *mut u8).unwrap_or(NonNull::dangling())
}

/// Rebuild the typed error for a refused wrap from its status code.
fn wrap_error(status: XbufError, data: *mut c_void, nitems: usize, dtype: ElementKind) -> Error {
    match status {
        XbufError::XbufNullPointer => Error::NullPointer,
        XbufError::XbufMisalignedPointer => Error::MisalignedPointer {
            addr: data as usize,
            align: dtype.align(),
        },
        XbufError::XbufInvalidSize => Error::InvalidSize {
            nitems,
            itemsize: dtype.itemsize(),
        },
        XbufError::XbufUnknownKind => Error::UnknownKind(format!("tag {}", dtype.tag())),
        other => Error::from_xbuf(other),
    }
}

fn check_aligned(addr: usize, dtype: ElementKind) -> Result<()> {
    if addr % dtype.align() == 0 {
        Ok(())
    } else {
        Err(Error::MisalignedPointer {
            addr,
            align: dtype.align(),
        })
    }
}

impl Wrapper {
    /// Take ownership of an existing handle.
    ///
    /// Fails with `UseAfterDestroy` if the handle is no longer live. If the
    /// handle is live but its metadata is inconsistent, it is destroyed
    /// before the error is returned.
    ///
    /// # Safety
    /// - `handle` must come from the configured entry points and must not be
    ///   owned by anything else.
    /// - For non-owning containers, the borrowed memory must outlive the
    ///   wrapper.
    pub unsafe fn from_handle(handle: *mut XbufContainer) -> Result<Self> {
        let entry_points = config::entry_points()?;
        Self::adopt(entry_points, handle)
    }

    unsafe fn adopt(entry_points: EntryPoints, handle: *mut XbufContainer) -> Result<Self> {
        let handle = NonNull::new(handle).ok_or(Error::NullPointer)?;
        if !(entry_points.is_live)(handle.as_ptr()) {
            return Err(Error::UseAfterDestroy);
        }

        match read_metadata(&entry_points, handle) {
            Ok((info, data)) => {
                log::debug!(
                    "[xbuf] wrapped {:p}: {} x {} (owner={}, mutable={})",
                    handle,
                    info.nitems,
                    info.dtype,
                    info.is_owner,
                    info.is_mutable
                );
                Ok(Self {
                    handle: Some(handle),
                    entry_points,
                    info,
                    data,
                })
            }
            Err(err) => {
                log::error!("[xbuf] rejecting handle {:p}: {}", handle, err);
                if let Err(destroy_err) = map_status((entry_points.destroy)(handle.as_ptr())) {
                    log::error!("[xbuf] destroy of {:p} failed: {}", handle, destroy_err);
                }
                Err(err)
            }
        }
    }

    /// Allocate a zero-filled, owned, mutable container by presentation name.
    pub fn allocate(nitems: usize, dtype: &str) -> Result<Self> {
        let kind = ElementKind::from_name(dtype)?;
        Self::allocate_kind(nitems, kind)
    }

    pub fn allocate_kind(nitems: usize, dtype: ElementKind) -> Result<Self> {
        Self::allocate_with(config::entry_points()?, nitems, dtype)
    }

    /// Allocate a container of the kind bound to `T`.
    pub fn allocate_for<T: Element>(nitems: usize) -> Result<Self> {
        Self::allocate_kind(nitems, T::KIND)
    }

    /// Allocate through an explicit table instead of the configured one.
    /// The same table later destroys the container.
    pub fn allocate_with(
        entry_points: EntryPoints,
        nitems: usize,
        dtype: ElementKind,
    ) -> Result<Self> {
        let bytes = dtype.byte_len(nitems)?;
        config::check_alloc_bytes(bytes)?;

        let handle = unsafe { (entry_points.constructors.for_kind(dtype))(nitems) };
        if handle.is_null() {
            log::error!("[xbuf] allocation of {} x {} failed", nitems, dtype);
            return Err(Error::AllocationFailure { bytes });
        }
        unsafe { Self::adopt(entry_points, handle) }
    }

    /// Wrap caller memory in a non-owning, mutable container.
    ///
    /// # Safety
    /// `data` must be valid for reads and writes of `nitems` elements of
    /// `dtype` for the whole life of the wrapper, and must not be accessed
    /// through other pointers while views are alive.
    pub unsafe fn from_external(data: *mut c_void, nitems: usize, dtype: &str) -> Result<Self> {
        let kind = ElementKind::from_name(dtype)?;
        Self::from_external_kind(data, nitems, kind)
    }

    /// # Safety
    /// See [`Wrapper::from_external`].
    pub unsafe fn from_external_kind(
        data: *mut c_void,
        nitems: usize,
        dtype: ElementKind,
    ) -> Result<Self> {
        let entry_points = config::entry_points()?;

        let mut handle = std::ptr::null_mut();
        let status = (entry_points.wrap)(data, nitems, dtype.tag(), true, &mut handle);
        if status != XbufError::XbufOk {
            return Err(wrap_error(status, data, nitems, dtype));
        }
        Self::adopt(entry_points, handle)
    }

    /// Wrap a Rust slice, reinterpreted as `dtype` when given.
    ///
    /// The item count is the slice's byte length divided by the itemsize of
    /// the resulting kind.
    ///
    /// # Safety
    /// `buf` must outlive the wrapper and must not be touched while views
    /// are alive.
    pub unsafe fn from_external_slice<T: Element>(
        buf: &mut [T],
        dtype: Option<&str>,
    ) -> Result<Self> {
        let kind = match dtype {
            Some(name) => ElementKind::from_name(name)?,
            None => T::KIND,
        };
        let nitems = mem::size_of_val(buf) / kind.itemsize();
        Self::from_external_kind(buf.as_mut_ptr().cast::<c_void>(), nitems, kind)
    }

    pub fn nitems(&self) -> usize {
        self.info.nitems
    }

    pub fn capacity(&self) -> usize {
        self.info.capacity
    }

    pub fn itemsize(&self) -> usize {
        self.info.itemsize
    }

    pub fn dtype(&self) -> ElementKind {
        self.info.dtype
    }

    /// Presentation name of the element kind (`"int32"`, ...).
    pub fn dtype_name(&self) -> &'static str {
        registry::presentation_name(self.info.dtype)
    }

    pub fn is_mutable(&self) -> bool {
        self.info.is_mutable
    }

    pub fn is_owner(&self) -> bool {
        self.info.is_owner
    }

    pub fn info(&self) -> ContainerInfo {
        self.info
    }

    /// The raw handle, still owned by the wrapper.
    pub fn as_ptr(&self) -> *mut XbufContainer {
        self.handle.map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    pub fn data_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Whether the native side still knows the handle.
    pub fn is_live(&self) -> bool {
        self.handle
            .is_some_and(|handle| unsafe { (self.entry_points.is_live)(handle.as_ptr()) })
    }

    fn live_handle(&self) -> Result<NonNull<XbufContainer>> {
        let handle = self.handle.ok_or(Error::UseAfterDestroy)?;
        if unsafe { (self.entry_points.is_live)(handle.as_ptr()) } {
            Ok(handle)
        } else {
            Err(Error::UseAfterDestroy)
        }
    }

    /// Read-only view over the buffer. The view borrows the wrapper, so the
    /// container cannot be closed while it is in use:
    ///
    /// ```compile_fail
    /// xbuf::configure_native();
    /// let wrapper = xbuf::Wrapper::allocate(4, "int32").unwrap();
    /// let items = wrapper.view().unwrap().as_slice::<i32>().unwrap();
    /// wrapper.close().unwrap();
    /// assert_eq!(items.len(), 4);
    /// ```
    pub fn view(&self) -> Result<View<'_>> {
        self.live_handle()?;
        Ok(unsafe { View::new(self.data, self.info.nitems, self.info.dtype) })
    }

    /// Writable view. Fails with `ImmutableBufferWrite` on read-only
    /// containers.
    pub fn view_mut(&mut self) -> Result<ViewMut<'_>> {
        self.live_handle()?;
        if !self.info.is_mutable {
            return Err(Error::ImmutableBufferWrite);
        }
        Ok(unsafe { ViewMut::new(self.data, self.info.nitems, self.info.dtype) })
    }

    pub fn read<T: Element>(&self, index: usize) -> Result<T> {
        self.view()?.get(index)
    }

    pub fn write<T: Element>(&mut self, index: usize, value: T) -> Result<()> {
        self.view_mut()?.set(index, value)
    }

    pub fn write_slice<T: Element>(&mut self, src: &[T]) -> Result<()> {
        self.view_mut()?.copy_from_slice(src)
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.view()?.to_vec()
    }

    /// Destroy the container now and report the outcome.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    /// Give up ownership without destroying. The caller becomes responsible
    /// for destroying the handle.
    #[must_use]
    pub fn into_raw(self) -> *mut XbufContainer {
        let mut this = ManuallyDrop::new(self);
        this.handle
            .take()
            .map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    fn release(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        log::debug!("[xbuf] destroying {:p}", handle);
        map_status(unsafe { (self.entry_points.destroy)(handle.as_ptr()) })
    }
}

unsafe fn read_metadata(
    entry_points: &EntryPoints,
    handle: NonNull<XbufContainer>,
) -> Result<(ContainerInfo, NonNull<u8>)> {
    let h = handle.as_ptr();

    let dtype = ElementKind::from_tag((entry_points.get_dtype)(h))?;
    let itemsize = (entry_points.get_itemsize)(h);
    if itemsize != dtype.itemsize() {
        return Err(Error::ItemsizeMismatch {
            dtype,
            reported: itemsize,
        });
    }

    let nitems = (entry_points.get_nitems)(h);
    dtype.byte_len(nitems)?;

    let data = match NonNull::new((entry_points.get_data)(h).cast::<u8>()) {
        Some(data) => data,
        None if nitems == 0 => dangling(dtype),
        None => return Err(Error::NullPointer),
    };
    check_aligned(data.as_ptr() as usize, dtype)?;

    let info = ContainerInfo {
        nitems,
        capacity: (entry_points.get_capacity)(h),
        itemsize,
        dtype,
        is_mutable: (entry_points.get_is_mutable)(h),
        is_owner: (entry_points.get_is_owner)(h),
    };
    Ok((info, data))
}

impl std::fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapper")
            .field("handle", &self.handle)
            .field("info", &self.info)
            .finish()
    }
}

impl Drop for Wrapper {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::error!("[xbuf] teardown failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_round_trip() {
        config::configure_native();
        let mut wrapper = Wrapper::allocate(3, "int64").unwrap();
        assert_eq!(wrapper.to_vec::<i64>().unwrap(), vec![0, 0, 0]);
        wrapper.write_slice(&[1i64, -2, 3]).unwrap();
        assert_eq!(wrapper.read::<i64>(1).unwrap(), -2);
        assert_eq!(wrapper.dtype_name(), "int64");
        assert!(wrapper.is_owner());
        wrapper.close().unwrap();
    }

    #[test]
    fn null_handle_is_rejected() {
        config::configure_native();
        let err = unsafe { Wrapper::from_handle(std::ptr::null_mut()) }.unwrap_err();
        assert_eq!(err, Error::NullPointer);
    }

    #[test]
    fn into_raw_keeps_handle_alive() {
        config::configure_native();
        let wrapper = Wrapper::allocate_for::<u32>(2).unwrap();
        let handle = wrapper.into_raw();
        assert!(xbuf_c::xbuf_container_is_live(handle));
        let wrapper = unsafe { Wrapper::from_handle(handle) }.unwrap();
        assert_eq!(wrapper.nitems(), 2);
        drop(wrapper);
        assert!(!xbuf_c::xbuf_container_is_live(handle));
    }

    #[test]
    fn dangling_is_aligned() {
        for kind in ElementKind::ALL {
            assert_eq!(dangling(kind).as_ptr() as usize % kind.align(), 0);
        }
    }
}
