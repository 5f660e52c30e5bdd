// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::CopyError;
use crate::heap::{Handle, Heap};
use crate::types::{TypeId, TypeTable};
use crate::value::{Data, Value};
use crate::Rc;

/// A source value with its reference layers removed.
#[derive(Debug, Clone)]
pub struct Source {
    pub value: Value,
    /// Last heap cell crossed on the way to `value`, if any.
    pub identity: Option<Handle>,
}

/// Follows pointers and any-boxes on the source side. Never allocates.
///
/// Returns `None` when there is nothing to copy from: a nil reference, an invalid value, a cell
/// that is currently being written by the same copy, or a chain of pointers that loops back on
/// itself. With `keep_interface` set, the walk stops at the first any-box (nil or not) instead of
/// opening it.
pub fn resolve_source(
    heap: &Heap,
    value: &Value,
    keep_interface: bool,
) -> Result<Option<Source>, CopyError> {
    let mut current = value;
    let mut identity = None;
    let mut hops = 0usize;
    loop {
        match current.data() {
            Data::Invalid | Data::Pointer(None) => return Ok(None),
            Data::Pointer(Some(handle)) => {
                hops += 1;
                if hops > heap.len() {
                    return Ok(None);
                }
                if !heap.contains(*handle) {
                    return Err(CopyError::DanglingPointer(*handle));
                }
                match heap.get(*handle) {
                    Some(next) => {
                        identity = Some(*handle);
                        current = next;
                    }
                    None => return Ok(None),
                }
            }
            Data::Interface(_) if keep_interface => break,
            Data::Interface(None) => return Ok(None),
            Data::Interface(Some(inner)) => current = &**inner,
            _ => break,
        }
    }
    Ok(Some(Source {
        value: current.clone(),
        identity,
    }))
}

/// Removes any-box layers only; pointers are kept.
pub fn strip_interfaces(value: &Value) -> Option<&Value> {
    let mut current = value;
    loop {
        match current.data() {
            Data::Interface(Some(inner)) => current = &**inner,
            Data::Interface(None) => return None,
            _ => return Some(current),
        }
    }
}

/// Cell behind a destination pointer. A nil pointer is pointed at a freshly allocated zero value
/// of its element type first.
pub fn allocate(
    types: &TypeTable,
    heap: &mut Heap,
    pointer: &mut Value,
) -> Result<Handle, CopyError> {
    match pointer.data() {
        Data::Pointer(Some(handle)) if heap.contains(*handle) => return Ok(*handle),
        Data::Pointer(Some(handle)) => return Err(CopyError::DanglingPointer(*handle)),
        Data::Pointer(None) => (),
        _ => return Err(CopyError::unsupported(types, pointer)),
    }
    let elem = types
        .elem(pointer.ty())
        .ok_or_else(|| CopyError::unsupported(types, pointer))?;
    let handle = heap.alloc(types.zero(elem)?);
    *pointer.data_mut() = Data::Pointer(Some(handle));
    Ok(handle)
}

/// Mutable access to the content of a destination any-box. A nil box, or one holding a value of
/// another type, first receives the zero value of `dynamic`, the type of the value about to be
/// copied in.
pub fn open_interface<'v>(
    types: &TypeTable,
    boxed: &'v mut Value,
    dynamic: TypeId,
) -> Result<Option<&'v mut Value>, CopyError> {
    let Data::Interface(slot) = boxed.data_mut() else {
        return Ok(None);
    };
    if slot.as_ref().map(|inner| inner.ty()) != Some(dynamic) {
        *slot = Some(Rc::new(types.zero(dynamic)?));
    }
    Ok(slot.as_mut().map(Rc::make_mut))
}
