// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Container core.
//!
//! [`DataContainer`] describes a typed, contiguous buffer together with its
//! ownership and mutability flags. It either owns its allocation (fresh
//! allocation, adopted `Vec<T>`) or borrows memory supplied by the caller.
//! Dropping the container is the `destroy` operation: the buffer is released
//! if and only if the container owns it.

use std::alloc::{alloc_zeroed, dealloc};
use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::slice;

use libc::c_void;

use crate::dtype::{check_element, Element, ElementKind};
use crate::error::{Error, Result};

/// Whether the container releases its buffer on destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owner,
    NotOwner,
}

/// Whether views over the container may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Mutable,
    NotMutable,
}

impl From<bool> for Mutability {
    fn from(is_mutable: bool) -> Self {
        if is_mutable {
            Mutability::Mutable
        } else {
            Mutability::NotMutable
        }
    }
}

/// A typed contiguous buffer with explicit ownership and mutability.
#[derive(Debug)]
pub struct DataContainer {
    /// Number of valid elements.
    nitems: usize,
    /// Element slots backed by the allocation. Only meaningful for owners.
    capacity: usize,
    dtype: ElementKind,
    owner: Ownership,
    mutable: Mutability,
    /// Never null; dangling (but aligned) when no bytes are backed.
    data: NonNull<u8>,
}

// Moved between threads by the handle table.
unsafe impl Send for DataContainer {}

fn dangling_for(kind: ElementKind) -> NonNull<u8> {
    // `align` is a non-zero power of two, so this is a valid dangling address.
    NonNull::new(kind.align() as *mut u8).unwrap_or(NonNull::dangling())
}

impl DataContainer {
    /// Allocate a zero-filled, owning and mutable container.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSize`] if `nitems * itemsize` overflows.
    /// - [`Error::AllocationFailure`] if the allocator returns null.
    pub fn allocate(nitems: usize, dtype: ElementKind) -> Result<Self> {
        let layout = dtype.layout(nitems)?;

        let data = if layout.size() == 0 {
            dangling_for(dtype)
        } else {
            // SAFETY: layout has a non-zero size.
            let raw = unsafe { alloc_zeroed(layout) };
            NonNull::new(raw).ok_or(Error::AllocationFailure {
                bytes: layout.size(),
            })?
        };

        log::debug!(
            "[xbuf] allocated {} x {} ({} bytes)",
            nitems,
            dtype,
            layout.size()
        );

        Ok(Self {
            nitems,
            capacity: nitems,
            dtype,
            owner: Ownership::Owner,
            mutable: Mutability::Mutable,
            data,
        })
    }

    /// Wrap caller-owned memory without taking ownership.
    ///
    /// # Safety
    ///
    /// - `data` must point to at least `nitems * itemsize(dtype)` readable
    ///   bytes (writable too if `mutable` is [`Mutability::Mutable`]).
    /// - The memory must outlive the container and every view derived from
    ///   it. The container cannot detect a dangling external buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::NullPointer`] if `data` is null and `nitems > 0`.
    /// - [`Error::MisalignedPointer`] if `data` is not aligned for `dtype`.
    /// - [`Error::InvalidSize`] if the byte size overflows.
    pub unsafe fn wrap(
        data: *mut c_void,
        nitems: usize,
        dtype: ElementKind,
        mutable: Mutability,
    ) -> Result<Self> {
        dtype.layout(nitems)?;

        let data = match NonNull::new(data.cast::<u8>()) {
            Some(ptr) => ptr,
            None if nitems == 0 => dangling_for(dtype),
            None => return Err(Error::NullPointer),
        };

        let addr = data.as_ptr() as usize;
        if addr % dtype.align() != 0 {
            return Err(Error::MisalignedPointer {
                addr,
                align: dtype.align(),
            });
        }

        Ok(Self {
            nitems,
            capacity: nitems,
            dtype,
            owner: Ownership::NotOwner,
            mutable,
            data,
        })
    }

    /// Borrow a slice as a non-owning, immutable container.
    ///
    /// # Safety
    ///
    /// The container must not outlive `slice`.
    pub unsafe fn from_slice<T: Element>(slice: &[T]) -> Self {
        Self {
            nitems: slice.len(),
            capacity: slice.len(),
            dtype: T::KIND,
            owner: Ownership::NotOwner,
            mutable: Mutability::NotMutable,
            data: NonNull::from(slice).cast::<u8>(),
        }
    }

    /// Borrow a mutable slice as a non-owning, mutable container.
    ///
    /// # Safety
    ///
    /// The container must not outlive `slice`, and `slice` must not be
    /// accessed through other paths while the container is in use.
    pub unsafe fn from_slice_mut<T: Element>(slice: &mut [T]) -> Self {
        Self {
            nitems: slice.len(),
            capacity: slice.len(),
            dtype: T::KIND,
            owner: Ownership::NotOwner,
            mutable: Mutability::Mutable,
            data: NonNull::from(slice).cast::<u8>(),
        }
    }

    /// Take ownership of a vector. Its capacity is kept.
    #[must_use]
    pub fn from_vec<T: Element>(vec: Vec<T>) -> Self {
        let mut vec = ManuallyDrop::new(vec);
        let nitems = vec.len();
        let capacity = vec.capacity();
        let data = NonNull::new(vec.as_mut_ptr().cast::<u8>()).unwrap_or(dangling_for(T::KIND));

        Self {
            nitems,
            capacity,
            dtype: T::KIND,
            owner: Ownership::Owner,
            mutable: Mutability::Mutable,
            data,
        }
    }

    /// Give the buffer back as a vector.
    ///
    /// # Errors
    ///
    /// - [`Error::NotOwner`] for a borrowed buffer.
    /// - [`Error::DtypeMismatch`] if `T` is not the container's kind.
    pub fn into_vec<T: Element>(self) -> Result<Vec<T>> {
        if self.owner != Ownership::Owner {
            return Err(Error::NotOwner);
        }
        check_element::<T>(self.dtype)?;

        let this = ManuallyDrop::new(self);
        // SAFETY: owning buffers are allocated with `dtype.layout(capacity)`,
        // which equals `Layout::array::<T>(capacity)` for the matching `T`.
        Ok(unsafe { Vec::from_raw_parts(this.data.as_ptr().cast::<T>(), this.nitems, this.capacity) })
    }

    /// Typed read access.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        check_element::<T>(self.dtype)?;
        // SAFETY: data is aligned for T and backs `nitems` elements.
        Ok(unsafe { slice::from_raw_parts(self.data.as_ptr().cast::<T>(), self.nitems) })
    }

    /// Typed write access.
    ///
    /// # Errors
    ///
    /// [`Error::ImmutableBufferWrite`] if the container is not mutable.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        if self.mutable != Mutability::Mutable {
            return Err(Error::ImmutableBufferWrite);
        }
        check_element::<T>(self.dtype)?;
        // SAFETY: as above; `&mut self` guarantees exclusive access.
        Ok(unsafe { slice::from_raw_parts_mut(self.data.as_ptr().cast::<T>(), self.nitems) })
    }

    /// Raw bytes of the valid elements.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `byte_len` was validated at construction.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.byte_len()) }
    }

    #[must_use]
    pub fn nitems(&self) -> usize {
        self.nitems
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per element, always derived from the dtype.
    #[must_use]
    pub fn itemsize(&self) -> usize {
        self.dtype.itemsize()
    }

    #[must_use]
    pub fn dtype(&self) -> ElementKind {
        self.dtype
    }

    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.mutable == Mutability::Mutable
    }

    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.owner == Ownership::Owner
    }

    #[must_use]
    pub fn data_ptr(&self) -> *mut c_void {
        self.data.as_ptr().cast::<c_void>()
    }

    fn byte_len(&self) -> usize {
        self.nitems * self.itemsize()
    }
}

impl Drop for DataContainer {
    /// Destroy the container. Owned memory is released; borrowed memory is
    /// left untouched.
    fn drop(&mut self) {
        if self.owner != Ownership::Owner {
            return;
        }

        let Ok(layout) = self.dtype.layout(self.capacity) else {
            log::error!("[xbuf] corrupt capacity {} on destroy", self.capacity);
            return;
        };

        if layout.size() != 0 {
            // SAFETY: owning buffers were allocated with exactly this layout,
            // either by `allocate` or by the `Vec<T>` adopted in `from_vec`.
            unsafe { dealloc(self.data.as_ptr(), layout) };
        }

        log::debug!("[xbuf] released {} bytes of {}", layout.size(), self.dtype);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_sets_owner_flags_and_zeroes() {
        for kind in ElementKind::ALL {
            let c = DataContainer::allocate(5, kind).unwrap();
            assert_eq!(c.nitems(), 5);
            assert_eq!(c.capacity(), 5);
            assert_eq!(c.dtype(), kind);
            assert_eq!(c.itemsize(), kind.itemsize());
            assert!(c.is_owner());
            assert!(c.is_mutable());
            assert!(c.as_bytes().iter().all(|&b| b == 0));
            assert_eq!(c.data_ptr() as usize % kind.align(), 0);
        }
    }

    #[test]
    fn allocate_empty_has_non_null_data() {
        let c = DataContainer::allocate(0, ElementKind::Float64).unwrap();
        assert!(!c.data_ptr().is_null());
        assert!(c.as_slice::<f64>().unwrap().is_empty());
    }

    #[test]
    fn allocate_overflow_is_invalid_size() {
        let err = DataContainer::allocate(usize::MAX / 2, ElementKind::Int64).unwrap_err();
        assert!(matches!(err, Error::InvalidSize { itemsize: 8, .. }));
    }

    #[test]
    fn typed_access_checks_dtype() {
        let mut c = DataContainer::allocate(3, ElementKind::Int32).unwrap();
        c.as_mut_slice::<i32>().unwrap().copy_from_slice(&[7, 8, 9]);
        assert_eq!(c.as_slice::<i32>().unwrap(), &[7, 8, 9]);
        assert!(matches!(
            c.as_slice::<u32>(),
            Err(Error::DtypeMismatch { .. })
        ));
    }

    #[test]
    fn wrap_does_not_free_external_buffer() {
        let mut external = vec![1.5f32, 2.5, 3.5];
        let c = unsafe {
            DataContainer::wrap(
                external.as_mut_ptr().cast(),
                external.len(),
                ElementKind::Float32,
                Mutability::Mutable,
            )
        }
        .unwrap();
        assert!(!c.is_owner());
        assert_eq!(c.as_slice::<f32>().unwrap(), &[1.5, 2.5, 3.5]);
        drop(c);
        assert_eq!(external, vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn wrap_rejects_null_and_misaligned_pointers() {
        let err = unsafe {
            DataContainer::wrap(std::ptr::null_mut(), 2, ElementKind::Int8, Mutability::Mutable)
        }
        .unwrap_err();
        assert_eq!(err, Error::NullPointer);

        let empty = unsafe {
            DataContainer::wrap(std::ptr::null_mut(), 0, ElementKind::Int64, Mutability::Mutable)
        }
        .unwrap();
        assert_eq!(empty.nitems(), 0);

        let mut backing = [0u64; 4];
        let misaligned = unsafe { backing.as_mut_ptr().cast::<u8>().add(1) };
        let err = unsafe {
            DataContainer::wrap(misaligned.cast(), 2, ElementKind::Int32, Mutability::Mutable)
        }
        .unwrap_err();
        assert!(matches!(err, Error::MisalignedPointer { align: 4, .. }));
    }

    #[test]
    fn immutable_container_rejects_writes() {
        let data = [4i64, 5, 6];
        let mut c = unsafe { DataContainer::from_slice(&data) };
        assert!(!c.is_mutable());
        assert_eq!(c.as_mut_slice::<i64>(), Err(Error::ImmutableBufferWrite));
        assert_eq!(c.as_slice::<i64>().unwrap(), &data);
    }

    #[test]
    fn from_slice_mut_writes_through() {
        let mut data = [0u8; 4];
        {
            let mut c = unsafe { DataContainer::from_slice_mut(&mut data) };
            c.as_mut_slice::<u8>().unwrap()[2] = 9;
        }
        assert_eq!(data, [0, 0, 9, 0]);
    }

    #[test]
    fn vec_round_trip_keeps_capacity() {
        let mut v = Vec::with_capacity(16);
        v.extend_from_slice(&[1usize, 2, 3]);
        let c = DataContainer::from_vec(v);
        assert_eq!(c.nitems(), 3);
        assert_eq!(c.capacity(), 16);
        let back = c.into_vec::<usize>().unwrap();
        assert_eq!(back, vec![1, 2, 3]);
        assert_eq!(back.capacity(), 16);
    }

    #[test]
    fn allocated_buffer_converts_into_vec() {
        let mut c = DataContainer::allocate(2, ElementKind::Float64).unwrap();
        c.as_mut_slice::<f64>().unwrap()[1] = 0.25;
        assert_eq!(c.into_vec::<f64>().unwrap(), vec![0.0, 0.25]);
    }

    #[test]
    fn into_vec_requires_ownership_and_matching_type() {
        let mut data = [1u32, 2];
        let borrowed = unsafe { DataContainer::from_slice_mut(&mut data) };
        assert_eq!(borrowed.into_vec::<u32>(), Err(Error::NotOwner));
        // the borrowed memory is neither freed nor modified
        data[0] += 10;
        assert_eq!(data, [11, 2]);

        let owned = DataContainer::from_vec(vec![1u32]);
        assert!(matches!(
            owned.into_vec::<i32>(),
            Err(Error::DtypeMismatch { .. })
        ));
    }
}
