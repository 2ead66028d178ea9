// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide configuration. Everything runs in one test so the states
//! are observed in order.

use std::sync::atomic::{AtomicUsize, Ordering};

use xbuf::config::{self, Constructors, EntryPoints};
use xbuf::{ElementKind, Error, Wrapper, XbufContainer, XbufError};

static DESTROYS: AtomicUsize = AtomicUsize::new(0);
static LAST_DESTROYED: AtomicUsize = AtomicUsize::new(0);
static INT32_ALLOCS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn counting_destroy(handle: *mut XbufContainer) -> XbufError {
    DESTROYS.fetch_add(1, Ordering::SeqCst);
    LAST_DESTROYED.store(handle as usize, Ordering::SeqCst);
    xbuf_c::xbuf_container_destroy(handle)
}

unsafe extern "C" fn counting_new_i32(nitems: usize) -> *mut XbufContainer {
    INT32_ALLOCS.fetch_add(1, Ordering::SeqCst);
    xbuf_c::xbuf_container_new_i32(nitems)
}

unsafe extern "C" fn odd_itemsize(_handle: *const XbufContainer) -> usize {
    3
}

unsafe extern "C" fn unknown_dtype(_handle: *const XbufContainer) -> u32 {
    77
}

fn destroys() -> usize {
    DESTROYS.load(Ordering::SeqCst)
}

fn last_destroyed() -> *const XbufContainer {
    LAST_DESTROYED.load(Ordering::SeqCst) as *const XbufContainer
}

#[test]
fn configuration_lifecycle() {
    // unconfigured
    assert!(!xbuf::is_configured());
    assert_eq!(xbuf::entry_points().unwrap_err(), Error::NotConfigured);
    assert_eq!(
        Wrapper::allocate(4, "int8").unwrap_err(),
        Error::NotConfigured
    );
    assert_eq!(
        xbuf::kind_for("int8").unwrap_err(),
        Error::NotConfigured
    );
    assert_eq!(
        xbuf::kind_for("int9").unwrap_err(),
        Error::UnknownKind("int9".into())
    );

    // destroy runs exactly once per wrapper
    config::configure(EntryPoints {
        destroy: counting_destroy,
        ..EntryPoints::native()
    });
    {
        let mut wrapper = Wrapper::allocate(4, "int8").unwrap();
        wrapper.write(0, 7i8).unwrap();
    }
    assert_eq!(destroys(), 1);

    let wrapper = Wrapper::allocate(1, "float64").unwrap();
    wrapper.close().unwrap();
    assert_eq!(destroys(), 2);

    let handle = Wrapper::allocate(1, "uint64").unwrap().into_raw();
    assert_eq!(destroys(), 2);
    assert_eq!(
        unsafe { xbuf_c::xbuf_container_destroy(handle) },
        XbufError::XbufOk
    );

    // a handle failing validation is destroyed before the error returns
    config::configure(EntryPoints {
        get_itemsize: odd_itemsize,
        destroy: counting_destroy,
        ..EntryPoints::native()
    });
    let before = destroys();
    assert_eq!(
        Wrapper::allocate(2, "int32").unwrap_err(),
        Error::ItemsizeMismatch {
            dtype: ElementKind::Int32,
            reported: 3
        }
    );
    assert_eq!(destroys(), before + 1);
    assert!(!xbuf_c::xbuf_container_is_live(last_destroyed()));

    config::configure(EntryPoints {
        get_dtype: unknown_dtype,
        destroy: counting_destroy,
        ..EntryPoints::native()
    });
    let before = destroys();
    assert_eq!(
        Wrapper::allocate(2, "float32").unwrap_err(),
        Error::UnknownKind("tag 77".into())
    );
    assert_eq!(destroys(), before + 1);
    assert!(!xbuf_c::xbuf_container_is_live(last_destroyed()));

    // wrappers keep the table they were built with
    config::configure(EntryPoints {
        destroy: counting_destroy,
        ..EntryPoints::native()
    });
    let held = Wrapper::allocate(2, "int32").unwrap();
    config::configure_native();
    let before = destroys();
    drop(held);
    assert_eq!(destroys(), before + 1);

    // an explicit table is used for both construction and teardown
    let native = EntryPoints::native();
    let custom = EntryPoints {
        constructors: Constructors {
            int32: counting_new_i32,
            ..native.constructors
        },
        destroy: counting_destroy,
        ..native
    };
    let before = destroys();
    let wrapper = Wrapper::allocate_with(custom, 2, ElementKind::Int32).unwrap();
    assert_eq!(INT32_ALLOCS.load(Ordering::SeqCst), 1);
    assert_eq!(wrapper.to_vec::<i32>().unwrap(), vec![0, 0]);
    drop(wrapper);
    assert_eq!(destroys(), before + 1);

    // the configured table was not consulted
    drop(Wrapper::allocate(2, "int32").unwrap());
    assert_eq!(INT32_ALLOCS.load(Ordering::SeqCst), 1);
    assert_eq!(destroys(), before + 1);

    // allocation ceiling
    config::set_max_alloc_bytes(Some(64));
    assert_eq!(config::max_alloc_bytes(), Some(64));
    assert!(Wrapper::allocate(8, "float64").is_ok());
    assert_eq!(
        Wrapper::allocate(9, "float64").unwrap_err(),
        Error::AllocationFailure { bytes: 72 }
    );
    config::set_max_alloc_bytes(None);
    assert!(Wrapper::allocate(9, "float64").is_ok());

    // size overflow is caught before the constructor runs
    assert!(matches!(
        Wrapper::allocate(usize::MAX, "int64").unwrap_err(),
        Error::InvalidSize { .. }
    ));
}
