// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::ops;

use serde::{Deserialize, Serialize};

/// Capabilities of a copy.
///
/// Every capability is off by default: opaque kinds are left at their zero value and shared
/// sub-structures in the source are duplicated. Sets combine with `|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Flags {
    /// Mirror shared sub-structures: every source cell reached more than once maps to a single
    /// destination cell.
    pub preserve_hierarchy: bool,
    /// Share channels.
    pub copy_chan: bool,
    /// Share functions.
    pub copy_func: bool,
    /// Copy raw addresses.
    pub copy_uintptr: bool,
    /// Copy untyped pointers.
    pub copy_unsafe_pointer: bool,
    /// Share any-boxes instead of deep copying their contents.
    pub copy_interface: bool,
}

impl Flags {
    pub const NONE: Flags = Flags {
        preserve_hierarchy: false,
        copy_chan: false,
        copy_func: false,
        copy_uintptr: false,
        copy_unsafe_pointer: false,
        copy_interface: false,
    };

    pub const PRESERVE_HIERARCHY: Flags = Flags {
        preserve_hierarchy: true,
        ..Flags::NONE
    };

    pub const COPY_CHAN: Flags = Flags {
        copy_chan: true,
        ..Flags::NONE
    };

    pub const COPY_FUNC: Flags = Flags {
        copy_func: true,
        ..Flags::NONE
    };

    pub const COPY_UINTPTR: Flags = Flags {
        copy_uintptr: true,
        ..Flags::NONE
    };

    pub const COPY_UNSAFE_POINTER: Flags = Flags {
        copy_unsafe_pointer: true,
        ..Flags::NONE
    };

    pub const COPY_INTERFACE: Flags = Flags {
        copy_interface: true,
        ..Flags::NONE
    };

    /// Every opaque-kind capability.
    pub const ALL_OPAQUE: Flags = Flags {
        preserve_hierarchy: false,
        copy_chan: true,
        copy_func: true,
        copy_uintptr: true,
        copy_unsafe_pointer: true,
        copy_interface: true,
    };

    pub const ALL: Flags = Flags {
        preserve_hierarchy: true,
        ..Flags::ALL_OPAQUE
    };

    pub const fn union(self, other: Flags) -> Flags {
        Flags {
            preserve_hierarchy: self.preserve_hierarchy || other.preserve_hierarchy,
            copy_chan: self.copy_chan || other.copy_chan,
            copy_func: self.copy_func || other.copy_func,
            copy_uintptr: self.copy_uintptr || other.copy_uintptr,
            copy_unsafe_pointer: self.copy_unsafe_pointer || other.copy_unsafe_pointer,
            copy_interface: self.copy_interface || other.copy_interface,
        }
    }

    /// Whether every capability of `other` is also set in `self`.
    pub const fn contains(self, other: Flags) -> bool {
        (self.preserve_hierarchy || !other.preserve_hierarchy)
            && (self.copy_chan || !other.copy_chan)
            && (self.copy_func || !other.copy_func)
            && (self.copy_uintptr || !other.copy_uintptr)
            && (self.copy_unsafe_pointer || !other.copy_unsafe_pointer)
            && (self.copy_interface || !other.copy_interface)
    }

    pub fn combine(flags: &[Flags]) -> Flags {
        flags.iter().fold(Flags::NONE, |acc, f| acc.union(*f))
    }
}

impl ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        self.union(rhs)
    }
}

impl ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        *self = self.union(rhs);
    }
}
