// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Live handle table.
//!
//! Containers handed across the C ABI live in a process-wide table keyed by
//! a non-zero id that is never reused. The opaque `XbufContainer*` carries
//! that id, so a stale or repeated handle is detected instead of
//! dereferenced: accessors on it fail and `destroy` reports
//! `XbufUseAfterDestroy` without touching memory.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::container::DataContainer;
use crate::XbufContainer;

struct HandleTable {
    next_id: usize,
    live: HashMap<usize, DataContainer>,
}

fn table() -> &'static Mutex<HandleTable> {
    static TABLE: OnceLock<Mutex<HandleTable>> = OnceLock::new();
    TABLE.get_or_init(|| {
        Mutex::new(HandleTable {
            next_id: 1,
            live: HashMap::new(),
        })
    })
}

/// Register a container and return its handle.
pub(crate) fn insert(container: DataContainer) -> *mut XbufContainer {
    let mut table = table().lock().unwrap_or_else(|err| err.into_inner());
    let id = table.next_id;
    table.next_id = table.next_id.wrapping_add(1).max(1);
    table.live.insert(id, container);
    id as *mut XbufContainer
}

/// Run `f` against the container behind `handle`, if it is live.
pub(crate) fn with<R>(
    handle: *const XbufContainer,
    f: impl FnOnce(&DataContainer) -> R,
) -> Option<R> {
    if handle.is_null() {
        return None;
    }

    let table = table().lock().unwrap_or_else(|err| err.into_inner());
    table.live.get(&(handle as usize)).map(f)
}

/// Unregister `handle` and hand its container back.
pub(crate) fn remove(handle: *const XbufContainer) -> Option<DataContainer> {
    if handle.is_null() {
        return None;
    }

    let mut table = table().lock().unwrap_or_else(|err| err.into_inner());
    table.live.remove(&(handle as usize))
}

pub(crate) fn is_live(handle: *const XbufContainer) -> bool {
    with(handle, |_| ()).is_some()
}

/// Move a container across the boundary.
///
/// The returned handle must eventually be released with
/// `xbuf_container_destroy` (or reclaimed with [`take_handle`]).
#[must_use]
pub fn into_handle(container: DataContainer) -> *mut XbufContainer {
    let handle = insert(container);
    log::debug!("[xbuf] exported container as handle {:p}", handle);
    handle
}

/// Reclaim a container previously exported with [`into_handle`] or created
/// through a C constructor. The handle is dead afterwards.
///
/// # Safety
/// Same contract as `xbuf_container_destroy`: no reference into the buffer
/// may be alive, and `handle` must not be owned by a live `xbuf::Wrapper`.
///
/// ```compile_fail
/// let handle = xbuf_c::xbuf_container_new_u8(2);
/// let container = xbuf_c::take_handle(handle); // requires `unsafe`
/// ```
#[must_use]
pub unsafe fn take_handle(handle: *mut XbufContainer) -> Option<DataContainer> {
    remove(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::ElementKind;

    #[test]
    fn ids_are_not_reused() {
        let a = insert(DataContainer::allocate(1, ElementKind::Int8).unwrap());
        assert!(remove(a).is_some());
        let b = insert(DataContainer::allocate(1, ElementKind::Int8).unwrap());
        assert_ne!(a, b);
        assert!(!is_live(a));
        assert!(is_live(b));
        assert!(remove(b).is_some());
    }

    #[test]
    fn removed_handle_is_dead() {
        let h = into_handle(DataContainer::from_vec(vec![3i32, 4]));
        assert_eq!(with(h, DataContainer::nitems), Some(2));
        let c = unsafe { take_handle(h) }.unwrap();
        assert_eq!(c.as_slice::<i32>().unwrap(), &[3, 4]);
        assert!(with(h, DataContainer::nitems).is_none());
        assert!(unsafe { take_handle(h) }.is_none());
    }

    #[test]
    fn null_handle_is_never_live() {
        assert!(!is_live(std::ptr::null()));
        assert!(remove(std::ptr::null()).is_none());
    }
}
