// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::coerce::{can_copy, convert_key, convert_scalar, CopyMode};
use crate::error::CopyError;
use crate::flags::Flags;
use crate::heap::{Handle, Heap};
use crate::resolve::{allocate, open_interface, resolve_source, strip_interfaces};
use crate::tracker::{Alias, AliasKey, AliasTracker};
use crate::types::{Kind, Type, TypeId, TypeTable};
use crate::value::{Data, Value};
use crate::Rc;

use std::collections::BTreeMap;

use log::{debug, trace};

/// Recursive copier for a single top-level call.
///
/// Destination slots are written in place. Pointers on the destination side are followed
/// (allocating zero-valued cells behind nil pointers) without consuming depth; struct fields,
/// map entries and sequence elements are one level deeper than their container. A slot whose
/// depth reaches `max_depth` keeps its current value.
pub struct CopyEngine<'a> {
    types: &'a TypeTable,
    heap: &'a mut Heap,
    flags: Flags,
    max_depth: usize,
    tracker: AliasTracker,
}

impl<'a> CopyEngine<'a> {
    pub fn new(types: &'a TypeTable, heap: &'a mut Heap, flags: Flags, max_depth: usize) -> Self {
        Self {
            types,
            heap,
            flags,
            max_depth,
            tracker: AliasTracker::new(flags.preserve_hierarchy),
        }
    }

    /// Copies `src` into the cell that `dst` points to. Anything other than a non-nil pointer
    /// destination is left alone.
    pub fn run(&mut self, dst: &Value, src: &Value) -> Result<(), CopyError> {
        debug!(
            "deep copy into {} from {} (max depth {})",
            self.types.name(dst.ty()),
            self.types.name(src.ty()),
            self.max_depth
        );
        let addressable = matches!(dst.data(), Data::Pointer(Some(_)));
        if !addressable || self.types.kind(dst.ty()) != Kind::Pointer {
            debug!("destination is not a non-nil pointer; nothing copied");
            return Ok(());
        }

        let mut root = dst.clone();
        let result = self.copy(&mut root, src, 0);
        debug!("deep copy finished with {} live aliases", self.tracker.len());
        result
    }

    fn kind_of(&self, value: &Value) -> Result<Kind, CopyError> {
        if value.ty() == TypeId::INVALID && !value.is_valid() {
            return Ok(Kind::Invalid);
        }
        let kind = self.types.kind(value.ty());
        if kind == Kind::Invalid || !value.data().matches(kind) {
            return Err(CopyError::unsupported(self.types, value));
        }
        Ok(kind)
    }

    fn copy(&mut self, dst: &mut Value, src: &Value, depth: usize) -> Result<(), CopyError> {
        match self.kind_of(dst)? {
            Kind::Invalid => Ok(()),
            Kind::Pointer => self.copy_through_pointer(dst, src, depth),
            Kind::Interface => self.copy_through_interface(dst, src, depth),
            kind => self.copy_value(dst, kind, src, depth),
        }
    }

    fn copy_through_pointer(
        &mut self,
        dst: &mut Value,
        src: &Value,
        depth: usize,
    ) -> Result<(), CopyError> {
        let types = self.types;
        let elem_ty = types
            .elem(dst.ty())
            .ok_or_else(|| CopyError::unsupported(types, dst))?;
        let elem_kind = types.kind(elem_ty);

        // Intermediate pointers of a multi-level pointer carry no identity of their own.
        if elem_kind == Kind::Pointer {
            if depth >= self.max_depth {
                return Ok(());
            }
            let handle = allocate(types, self.heap, dst)?;
            return self.write_cell(handle, src, depth);
        }

        let Some(source) = resolve_source(self.heap, src, elem_kind == Kind::Interface)? else {
            trace!("no source behind {}", types.name(src.ty()));
            return Ok(());
        };

        let key = source.identity.map(|handle| AliasKey {
            source: handle,
            ty: source.value.ty(),
            target: elem_ty,
        });
        if let Some(alias) = key.and_then(|key| self.tracker.lookup(&key)) {
            trace!(
                "reusing cell {} for {}",
                alias.destination.index(),
                types.name(elem_ty)
            );
            *dst.data_mut() = Data::Pointer(Some(alias.destination));
            return Ok(());
        }

        if depth >= self.max_depth {
            return Ok(());
        }

        let handle = allocate(types, self.heap, dst)?;
        if let Some(key) = key {
            self.tracker.record(
                key,
                Alias {
                    destination: handle,
                },
            );
        }
        let result = self.write_cell(handle, &source.value, depth);
        if let Some(key) = key {
            self.tracker.release(&key);
        }
        result
    }

    // The cell is moved out of the heap while it is written so that nested allocations can
    // borrow the heap. A source that reaches the same cell in the meantime sees nothing.
    fn write_cell(&mut self, handle: Handle, src: &Value, depth: usize) -> Result<(), CopyError> {
        let Some(mut cell) = self.heap.take(handle) else {
            trace!("cell {} is already being written", handle.index());
            return Ok(());
        };
        let result = self.copy(&mut cell, src, depth);
        self.heap.restore(handle, cell);
        result
    }

    // Box contents are copied at the depth of the box itself.
    fn copy_through_interface(
        &mut self,
        dst: &mut Value,
        src: &Value,
        depth: usize,
    ) -> Result<(), CopyError> {
        let Some(source) = resolve_source(self.heap, src, true)? else {
            return Ok(());
        };
        if depth >= self.max_depth {
            return Ok(());
        }

        let inner = if self.kind_of(&source.value)? == Kind::Interface {
            let mode = can_copy(Kind::Interface, Kind::Interface, self.flags);
            if mode == Some(CopyMode::Shared) {
                *dst.data_mut() = source.value.data().clone();
                return Ok(());
            }
            match strip_interfaces(&source.value) {
                Some(inner) => inner.clone(),
                None => return Ok(()),
            }
        } else {
            // A concrete source is boxed with its own type; a pointer stays a pointer.
            src.clone()
        };

        match open_interface(self.types, dst, inner.ty())? {
            Some(boxed) => self.copy(boxed, &inner, depth),
            None => Ok(()),
        }
    }

    fn copy_value(
        &mut self,
        dst: &mut Value,
        dst_kind: Kind,
        src: &Value,
        depth: usize,
    ) -> Result<(), CopyError> {
        let Some(source) = resolve_source(self.heap, src, false)? else {
            trace!("no source for {}", self.types.name(dst.ty()));
            return Ok(());
        };
        let Some(cell) = source.identity else {
            return self.copy_resolved(dst, dst_kind, &source.value, depth);
        };
        if !self.tracker.enter(cell) {
            trace!(
                "cell {} is already being copied into {}; left as is",
                cell.index(),
                self.types.name(dst.ty())
            );
            return Ok(());
        }
        let result = self.copy_resolved(dst, dst_kind, &source.value, depth);
        self.tracker.leave(cell);
        result
    }

    fn copy_resolved(
        &mut self,
        dst: &mut Value,
        dst_kind: Kind,
        src: &Value,
        depth: usize,
    ) -> Result<(), CopyError> {
        let src_kind = self.kind_of(src)?;
        if src_kind == Kind::Invalid || depth >= self.max_depth {
            return Ok(());
        }

        let Some(mode) = can_copy(dst_kind, src_kind, self.flags) else {
            trace!(
                "skipping {} <- {}",
                self.types.name(dst.ty()),
                self.types.name(src.ty())
            );
            return Ok(());
        };

        match mode {
            CopyMode::Direct | CopyMode::Numeric => {
                if let Some(data) = convert_scalar(dst_kind, src.data()) {
                    *dst.data_mut() = data;
                }
                Ok(())
            }
            CopyMode::Record => self.copy_struct(dst, src, depth),
            CopyMode::Mapping => self.copy_map(dst, src, depth),
            CopyMode::Sequence => self.copy_sequence(dst, dst_kind, src, depth),
            CopyMode::Shared => {
                *dst.data_mut() = src.data().clone();
                Ok(())
            }
        }
    }

    fn copy_struct(&mut self, dst: &mut Value, src: &Value, depth: usize) -> Result<(), CopyError> {
        let types = self.types;
        let (Some(dst_ty), Some(src_ty)) = (types.as_struct(dst.ty()), types.as_struct(src.ty()))
        else {
            return Ok(());
        };
        let Data::Struct(src_fields) = src.data() else {
            return Err(CopyError::unsupported(types, src));
        };
        let Data::Struct(dst_fields) = dst.data_mut() else {
            return Ok(());
        };
        let dst_fields = Rc::make_mut(dst_fields);

        for (idx, field) in dst_ty.fields.iter().enumerate() {
            if !field.exported {
                trace!("skipping private field {}.{}", dst_ty.name, field.name);
                continue;
            }
            let Some(src_idx) = src_ty.field_index(&field.name) else {
                continue;
            };
            if let (Some(d), Some(s)) = (dst_fields.get_mut(idx), src_fields.get(src_idx)) {
                self.copy(d, s, depth.saturating_add(1))?;
            }
        }
        Ok(())
    }

    fn copy_map(&mut self, dst: &mut Value, src: &Value, depth: usize) -> Result<(), CopyError> {
        let types = self.types;
        let (
            Some(Type::Map {
                key: dst_key,
                value: dst_value,
            }),
            Some(Type::Map { key: src_key, .. }),
        ) = (types.get(dst.ty()), types.get(src.ty()))
        else {
            return Ok(());
        };

        let entries = match src.data() {
            Data::Map(Some(entries)) => entries.clone(),
            _ => {
                *dst.data_mut() = Data::Map(None);
                return Ok(());
            }
        };

        let (dst_key_kind, src_key_kind) = (types.kind(*dst_key), types.kind(*src_key));
        let mut copied = BTreeMap::new();
        for (key, value) in entries.iter() {
            let Some(key) = convert_key(key, dst_key_kind, src_key_kind) else {
                trace!("dropping entry with unconvertible key {key:?}");
                continue;
            };
            let mut slot = types.zero(*dst_value)?;
            self.copy(&mut slot, value, depth.saturating_add(1))?;
            copied.insert(key, slot);
        }
        *dst.data_mut() = Data::Map(Some(Rc::new(copied)));
        Ok(())
    }

    fn copy_sequence(
        &mut self,
        dst: &mut Value,
        dst_kind: Kind,
        src: &Value,
        depth: usize,
    ) -> Result<(), CopyError> {
        let types = self.types;
        let (Some(dst_elem), Some(src_elem)) = (types.elem(dst.ty()), types.elem(src.ty())) else {
            return Ok(());
        };
        let items = match src.data() {
            Data::Array(items) => Some(items.clone()),
            Data::Slice(items) => items.clone(),
            _ => return Err(CopyError::unsupported(types, src)),
        };
        let next = depth.saturating_add(1);
        let bytes = dst_elem == TypeId::UINT8 && src_elem == TypeId::UINT8 && next < self.max_depth;

        if dst_kind == Kind::Slice {
            let Some(items) = items else {
                *dst.data_mut() = Data::Slice(None);
                return Ok(());
            };
            if bytes {
                *dst.data_mut() = Data::Slice(Some(Rc::new(items.to_vec())));
                return Ok(());
            }
            let mut copied = vec![types.zero(dst_elem)?; items.len()];
            for (d, s) in copied.iter_mut().zip(items.iter()) {
                self.copy(d, s, next)?;
            }
            *dst.data_mut() = Data::Slice(Some(Rc::new(copied)));
            return Ok(());
        }

        let Some(items) = items else {
            return Ok(());
        };
        let Data::Array(out) = dst.data_mut() else {
            return Ok(());
        };
        let out = Rc::make_mut(out);
        for (d, s) in out.iter_mut().zip(items.iter()) {
            if bytes {
                *d = s.clone();
            } else {
                self.copy(d, s, next)?;
            }
        }
        Ok(())
    }
}
