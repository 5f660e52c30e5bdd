// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::heap::{Handle, Heap};
use crate::value::{Data, Value};

use std::collections::BTreeSet;

impl Heap {
    /// Deep structural equality of two values living in this heap.
    ///
    /// Pointers are equal when both are nil or when their targets are deeply equal; a pair of
    /// cells already under comparison is assumed equal, so cyclic graphs terminate. Channels and
    /// functions compare by identity, floats by IEEE equality (NaN is never equal).
    pub fn deep_equal(&self, a: &Value, b: &Value) -> bool {
        let mut visiting = BTreeSet::new();
        self.deep_equal_inner(a, b, &mut visiting)
    }

    fn deep_equal_inner(
        &self,
        a: &Value,
        b: &Value,
        visiting: &mut BTreeSet<(Handle, Handle)>,
    ) -> bool {
        if a.ty() != b.ty() {
            return false;
        }
        match (a.data(), b.data()) {
            (Data::Pointer(x), Data::Pointer(y)) => self.cells_equal(*x, *y, visiting),
            (Data::Struct(x), Data::Struct(y)) | (Data::Array(x), Data::Array(y)) => {
                self.all_equal(x, y, visiting)
            }
            (Data::Slice(x), Data::Slice(y)) => match (x, y) {
                (None, None) => true,
                (Some(x), Some(y)) => self.all_equal(x, y, visiting),
                _ => false,
            },
            (Data::Map(x), Data::Map(y)) => match (x, y) {
                (None, None) => true,
                (Some(x), Some(y)) => {
                    x.len() == y.len()
                        && x.iter().all(|(k, v)| match y.get(k) {
                            Some(w) => self.deep_equal_inner(v, w, visiting),
                            None => false,
                        })
                }
                _ => false,
            },
            (Data::Interface(x), Data::Interface(y)) => match (x, y) {
                (None, None) => true,
                (Some(x), Some(y)) => self.deep_equal_inner(x, y, visiting),
                _ => false,
            },
            (x, y) => x == y,
        }
    }

    fn all_equal(
        &self,
        x: &[Value],
        y: &[Value],
        visiting: &mut BTreeSet<(Handle, Handle)>,
    ) -> bool {
        x.len() == y.len()
            && x
                .iter()
                .zip(y.iter())
                .all(|(v, w)| self.deep_equal_inner(v, w, visiting))
    }

    fn cells_equal(
        &self,
        x: Option<Handle>,
        y: Option<Handle>,
        visiting: &mut BTreeSet<(Handle, Handle)>,
    ) -> bool {
        match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) if x == y => true,
            (Some(x), Some(y)) => {
                if !visiting.insert((x, y)) {
                    return true;
                }
                match (self.get(x), self.get(y)) {
                    (Some(v), Some(w)) => self.deep_equal_inner(v, w, visiting),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}
