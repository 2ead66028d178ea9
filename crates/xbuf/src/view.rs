// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Zero-copy views over a container's buffer.
//!
//! A [`View`] borrows the [`Wrapper`](crate::Wrapper) it came from, so it
//! cannot outlive the container. [`ViewMut`] additionally requires a mutable
//! container and an exclusive borrow.

use std::marker::PhantomData;
use std::ptr::NonNull;
use std::slice;

use xbuf_c::{check_element, Element, ElementKind};

use crate::{Error, Result};

macro_rules! typed_arrays {
    ($($kind:ident => $ty:ty),* $(,)?) => {
        /// Read-only buffer contents typed by element kind.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum ArrayRef<'a> {
            $($kind(&'a [$ty]),)*
        }

        /// Writable buffer contents typed by element kind.
        #[derive(Debug, PartialEq)]
        pub enum ArrayMut<'a> {
            $($kind(&'a mut [$ty]),)*
        }

        impl<'a> ArrayRef<'a> {
            pub fn dtype(&self) -> ElementKind {
                match self {
                    $(Self::$kind(_) => ElementKind::$kind,)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Self::$kind(items) => items.len(),)*
                }
            }

            /// # Safety
            /// Same contract as [`View::new`].
            unsafe fn from_raw(data: NonNull<u8>, nitems: usize, dtype: ElementKind) -> Self {
                match dtype {
                    $(ElementKind::$kind => {
                        Self::$kind(slice::from_raw_parts(data.as_ptr().cast::<$ty>(), nitems))
                    })*
                }
            }
        }

        impl<'a> ArrayMut<'a> {
            pub fn dtype(&self) -> ElementKind {
                match self {
                    $(Self::$kind(_) => ElementKind::$kind,)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Self::$kind(items) => items.len(),)*
                }
            }

            /// # Safety
            /// Same contract as [`ViewMut::new`].
            unsafe fn from_raw(data: NonNull<u8>, nitems: usize, dtype: ElementKind) -> Self {
                match dtype {
                    $(ElementKind::$kind => {
                        Self::$kind(slice::from_raw_parts_mut(data.as_ptr().cast::<$ty>(), nitems))
                    })*
                }
            }
        }
    };
}

typed_arrays! {
    Float32 => f32,
    Float64 => f64,
    Int8 => i8,
    Int32 => i32,
    Int64 => i64,
    Unsigned8 => u8,
    Unsigned32 => u32,
    Unsigned64 => u64,
    Usize => usize,
}

impl ArrayRef<'_> {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArrayMut<'_> {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only view of `len()` elements of one kind.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    data: NonNull<u8>,
    nitems: usize,
    dtype: ElementKind,
    _buffer: PhantomData<&'a [u8]>,
}

impl<'a> View<'a> {
    /// # Safety
    /// `data` must be aligned for `dtype` and valid for reads of
    /// `nitems * dtype.itemsize()` bytes (no overflow) for `'a`, with no
    /// writes through other pointers during `'a`.
    pub(crate) unsafe fn new(data: NonNull<u8>, nitems: usize, dtype: ElementKind) -> Self {
        Self {
            data,
            nitems,
            dtype,
            _buffer: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.nitems
    }

    pub fn is_empty(&self) -> bool {
        self.nitems == 0
    }

    pub fn dtype(&self) -> ElementKind {
        self.dtype
    }

    pub fn itemsize(&self) -> usize {
        self.dtype.itemsize()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// The elements as `T`, which must be the kind bound to the buffer.
    pub fn as_slice<T: Element>(&self) -> Result<&'a [T]> {
        check_element::<T>(self.dtype)?;
        Ok(unsafe { slice::from_raw_parts(self.data.as_ptr().cast::<T>(), self.nitems) })
    }

    pub fn get<T: Element>(&self, index: usize) -> Result<T> {
        self.as_slice::<T>()?
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.nitems,
            })
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        Ok(self.as_slice::<T>()?.to_vec())
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.nitems * self.itemsize()) }
    }

    /// The elements typed by the buffer's own kind.
    pub fn array(&self) -> ArrayRef<'a> {
        unsafe { ArrayRef::from_raw(self.data, self.nitems, self.dtype) }
    }
}

/// Writable view. Only handed out for mutable containers.
#[derive(Debug)]
pub struct ViewMut<'a> {
    data: NonNull<u8>,
    nitems: usize,
    dtype: ElementKind,
    _buffer: PhantomData<&'a mut [u8]>,
}

impl<'a> ViewMut<'a> {
    /// # Safety
    /// As for [`View::new`], plus valid for writes and not aliased by any
    /// other live reference during `'a`.
    pub(crate) unsafe fn new(data: NonNull<u8>, nitems: usize, dtype: ElementKind) -> Self {
        Self {
            data,
            nitems,
            dtype,
            _buffer: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.nitems
    }

    pub fn is_empty(&self) -> bool {
        self.nitems == 0
    }

    pub fn dtype(&self) -> ElementKind {
        self.dtype
    }

    /// Reborrow as a read-only view.
    pub fn as_view(&self) -> View<'_> {
        unsafe { View::new(self.data, self.nitems, self.dtype) }
    }

    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.as_view().as_slice::<T>()
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        check_element::<T>(self.dtype)?;
        Ok(unsafe { slice::from_raw_parts_mut(self.data.as_ptr().cast::<T>(), self.nitems) })
    }

    /// Consume the view, keeping the mutable borrow for `'a`.
    pub fn into_mut_slice<T: Element>(self) -> Result<&'a mut [T]> {
        check_element::<T>(self.dtype)?;
        Ok(unsafe { slice::from_raw_parts_mut(self.data.as_ptr().cast::<T>(), self.nitems) })
    }

    pub fn get<T: Element>(&self, index: usize) -> Result<T> {
        self.as_view().get(index)
    }

    pub fn set<T: Element>(&mut self, index: usize, value: T) -> Result<()> {
        let len = self.nitems;
        let slot = self
            .as_mut_slice::<T>()?
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Overwrite every element. `src` must have exactly `len()` items.
    pub fn copy_from_slice<T: Element>(&mut self, src: &[T]) -> Result<()> {
        let expected = self.nitems;
        let dst = self.as_mut_slice::<T>()?;
        if src.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: src.len(),
            });
        }
        dst.copy_from_slice(src);
        Ok(())
    }

    pub fn fill<T: Element>(&mut self, value: T) -> Result<()> {
        self.as_mut_slice::<T>()?.fill(value);
        Ok(())
    }

    pub fn array(&self) -> ArrayRef<'_> {
        self.as_view().array()
    }

    pub fn array_mut(&mut self) -> ArrayMut<'_> {
        unsafe { ArrayMut::from_raw(self.data, self.nitems, self.dtype) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_of<T: Element>(items: &[T]) -> View<'_> {
        let data = NonNull::new(items.as_ptr() as *mut u8).unwrap();
        unsafe { View::new(data, items.len(), T::KIND) }
    }

    fn view_mut_of<T: Element>(items: &mut [T]) -> ViewMut<'_> {
        let data = NonNull::new(items.as_mut_ptr().cast::<u8>()).unwrap();
        unsafe { ViewMut::new(data, items.len(), T::KIND) }
    }

    #[test]
    fn typed_access_checks_kind() {
        let items = [1.5f64, -2.0];
        let view = view_of(&items);
        assert_eq!(view.as_slice::<f64>().unwrap(), &[1.5, -2.0]);
        assert_eq!(
            view.as_slice::<i64>().unwrap_err(),
            Error::DtypeMismatch {
                expected: ElementKind::Int64,
                actual: ElementKind::Float64,
            }
        );
        assert_eq!(view.as_bytes().len(), 16);
    }

    #[test]
    fn get_reports_bounds() {
        let items = [7u32, 8, 9];
        let view = view_of(&items);
        assert_eq!(view.get::<u32>(2).unwrap(), 9);
        assert_eq!(
            view.get::<u32>(3).unwrap_err(),
            Error::IndexOutOfBounds { index: 3, len: 3 }
        );
    }

    #[test]
    fn array_follows_dtype() {
        let items = [1usize, 2];
        let view = view_of(&items);
        assert_eq!(view.array(), ArrayRef::Usize(&[1, 2]));
        assert_eq!(view.array().dtype(), ElementKind::Usize);
        assert_eq!(view.array().len(), 2);
    }

    #[test]
    fn mutation_through_view() {
        let mut items = [0i8; 4];
        {
            let mut view = view_mut_of(&mut items);
            view.set(1, 5i8).unwrap();
            assert_eq!(
                view.copy_from_slice(&[1i8, 2]).unwrap_err(),
                Error::LengthMismatch {
                    expected: 4,
                    actual: 2
                }
            );
            if let ArrayMut::Int8(slots) = view.array_mut() {
                slots[3] = -1;
            }
            assert_eq!(view.get::<i8>(1).unwrap(), 5);
        }
        assert_eq!(items, [0, 5, 0, -1]);
    }

    #[test]
    fn fill_and_copy() {
        let mut items = [0.0f32; 3];
        let mut view = view_mut_of(&mut items);
        view.fill(2.5f32).unwrap();
        assert_eq!(view.as_slice::<f32>().unwrap(), &[2.5, 2.5, 2.5]);
        view.copy_from_slice(&[1.0f32, 2.0, 3.0]).unwrap();
        assert_eq!(view.array(), ArrayRef::Float32(&[1.0, 2.0, 3.0]));
    }
}
