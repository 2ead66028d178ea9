// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry: the closed set of element kinds a container can hold.
//!
//! Every [`ElementKind`] maps to exactly one native tag, byte size,
//! alignment and presentation name, in both directions:
//!
//! | kind        | tag | itemsize      | name      |
//! |-------------|-----|---------------|-----------|
//! | Float32     | 0   | 4             | `float32` |
//! | Float64     | 1   | 8             | `float64` |
//! | Int8        | 2   | 1             | `int8`    |
//! | Int32       | 3   | 4             | `int32`   |
//! | Int64       | 4   | 8             | `int64`   |
//! | Unsigned8   | 5   | 1             | `uint8`   |
//! | Unsigned32  | 6   | 4             | `uint32`  |
//! | Unsigned64  | 7   | 8             | `uint64`  |
//! | Usize       | 8   | pointer width | `uintp`   |

use std::alloc::Layout;
use std::fmt;
use std::mem::{align_of, size_of};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tag returned by `xbuf_container_get_dtype` for a dead handle.
pub const XBUF_DTYPE_INVALID: u32 = u32::MAX;

/// Element kind of a container (C-compatible enum).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    #[serde(rename = "float32")]
    Float32 = 0,
    #[serde(rename = "float64")]
    Float64 = 1,
    #[serde(rename = "int8")]
    Int8 = 2,
    #[serde(rename = "int32")]
    Int32 = 3,
    #[serde(rename = "int64")]
    Int64 = 4,
    #[serde(rename = "uint8")]
    Unsigned8 = 5,
    #[serde(rename = "uint32")]
    Unsigned32 = 6,
    #[serde(rename = "uint64")]
    Unsigned64 = 7,
    #[serde(rename = "uintp")]
    Usize = 8,
}

/// Static description of an element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    /// Bytes per element.
    pub itemsize: usize,
    /// Required alignment of the data pointer.
    pub align: usize,
    /// Presentation dtype name used by the consuming side.
    pub name: &'static str,
}

const fn info_of<T>(name: &'static str) -> KindInfo {
    KindInfo {
        itemsize: size_of::<T>(),
        align: align_of::<T>(),
        name,
    }
}

/// Registry lookup: itemsize, alignment and presentation name of `kind`.
#[must_use]
pub const fn kind_info(kind: ElementKind) -> KindInfo {
    match kind {
        ElementKind::Float32 => info_of::<f32>("float32"),
        ElementKind::Float64 => info_of::<f64>("float64"),
        ElementKind::Int8 => info_of::<i8>("int8"),
        ElementKind::Int32 => info_of::<i32>("int32"),
        ElementKind::Int64 => info_of::<i64>("int64"),
        ElementKind::Unsigned8 => info_of::<u8>("uint8"),
        ElementKind::Unsigned32 => info_of::<u32>("uint32"),
        ElementKind::Unsigned64 => info_of::<u64>("uint64"),
        ElementKind::Usize => info_of::<usize>("uintp"),
    }
}

impl ElementKind {
    /// Every kind, in tag order.
    pub const ALL: [ElementKind; 9] = [
        ElementKind::Float32,
        ElementKind::Float64,
        ElementKind::Int8,
        ElementKind::Int32,
        ElementKind::Int64,
        ElementKind::Unsigned8,
        ElementKind::Unsigned32,
        ElementKind::Unsigned64,
        ElementKind::Usize,
    ];

    /// Native tag carried across the C ABI.
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Resolve a native tag.
    pub fn from_tag(tag: u32) -> Result<Self> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or_else(|| Error::UnknownKind(format!("tag {tag}")))
    }

    /// Resolve a presentation dtype name (`"int32"`, `"float64"`, ...).
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::UnknownKind(name.to_string()))
    }

    #[must_use]
    pub const fn itemsize(self) -> usize {
        kind_info(self).itemsize
    }

    #[must_use]
    pub const fn align(self) -> usize {
        kind_info(self).align
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        kind_info(self).name
    }

    /// Byte size of `nitems` elements.
    pub fn byte_len(self, nitems: usize) -> Result<usize> {
        nitems
            .checked_mul(self.itemsize())
            .ok_or(Error::InvalidSize {
                nitems,
                itemsize: self.itemsize(),
            })
    }

    /// Allocation layout for `nitems` elements.
    ///
    /// Identical to `Layout::array::<T>(nitems)` for the kind's Rust type, so
    /// buffers allocated here can be handed to `Vec<T>` and back.
    pub fn layout(self, nitems: usize) -> Result<Layout> {
        let bytes = self.byte_len(nitems)?;
        Layout::from_size_align(bytes, self.align()).map_err(|_| Error::InvalidSize {
            nitems,
            itemsize: self.itemsize(),
        })
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl TryFrom<u32> for ElementKind {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self> {
        Self::from_tag(tag)
    }
}

/// Rust scalar types that can be stored in a container.
///
/// # Safety
///
/// `KIND` must describe `Self` exactly: `size_of::<Self>()` and
/// `align_of::<Self>()` must equal the registry's itemsize and alignment,
/// and every bit pattern of that size must be a valid `Self`.
pub unsafe trait Element: Copy + Default + PartialEq + fmt::Debug + 'static {
    const KIND: ElementKind;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            unsafe impl Element for $ty {
                const KIND: ElementKind = ElementKind::$kind;
            }
        )*
    };
}

impl_element! {
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    i32 => Int32,
    i64 => Int64,
    u8 => Unsigned8,
    u32 => Unsigned32,
    u64 => Unsigned64,
    usize => Usize,
}

/// Check that `T` matches `kind`.
pub fn check_element<T: Element>(kind: ElementKind) -> Result<()> {
    if T::KIND == kind {
        Ok(())
    } else {
        Err(Error::DtypeMismatch {
            expected: T::KIND,
            actual: kind,
        })
    }
}
