// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Element kind lookup by presentation name.

use xbuf_c::{Element, ElementKind, KindInfo};

use crate::config::{self, Constructor};
use crate::Result;

/// Resolve a presentation name (`"int32"`, `"uintp"`, ...) to its kind and
/// the configured constructor for it.
///
/// Fails with `UnknownKind` before consulting the entry points, and with
/// `NotConfigured` if no table is installed.
pub fn kind_for(name: &str) -> Result<(ElementKind, Constructor)> {
    let kind = ElementKind::from_name(name)?;
    let entry_points = config::entry_points()?;
    Ok((kind, entry_points.constructors.for_kind(kind)))
}

pub fn kind_info(kind: ElementKind) -> KindInfo {
    xbuf_c::kind_info(kind)
}

pub fn presentation_name(kind: ElementKind) -> &'static str {
    kind.name()
}

/// Presentation name of the kind bound to `T`.
pub fn presentation_name_of<T: Element>() -> &'static str {
    T::KIND.name()
}
