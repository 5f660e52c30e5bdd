// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::types::{TypeError, TypeId, TypeTable};
use crate::value::Value;

use serde::{Deserialize, Serialize};

/// Address of a heap cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(usize);

impl Handle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Live(Value),
    // The cell's value has been moved out while the engine writes into it.
    Busy,
}

/// Arena of heap cells. Pointers are handles into this arena, which is what lets value graphs
/// share cells and form cycles without reference-counted pointer loops.
#[derive(Debug, Clone, Default)]
pub struct Heap {
    slots: Vec<Slot>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn alloc(&mut self, value: Value) -> Handle {
        self.slots.push(Slot::Live(value));
        Handle(self.slots.len() - 1)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        handle.0 < self.slots.len()
    }

    /// The cell's value, or `None` for a dangling handle or a cell that is being written.
    pub fn get(&self, handle: Handle) -> Option<&Value> {
        match self.slots.get(handle.0) {
            Some(Slot::Live(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Value> {
        match self.slots.get_mut(handle.0) {
            Some(Slot::Live(v)) => Some(v),
            _ => None,
        }
    }

    pub fn set(&mut self, handle: Handle, value: Value) -> bool {
        match self.slots.get_mut(handle.0) {
            Some(slot) if matches!(slot, Slot::Live(_)) => {
                *slot = Slot::Live(value);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn take(&mut self, handle: Handle) -> Option<Value> {
        let slot = self.slots.get_mut(handle.0)?;
        match core::mem::replace(slot, Slot::Busy) {
            Slot::Live(v) => Some(v),
            Slot::Busy => None,
        }
    }

    pub(crate) fn restore(&mut self, handle: Handle, value: Value) {
        if let Some(slot) = self.slots.get_mut(handle.0) {
            *slot = Slot::Live(value);
        }
    }
}

/// Type table plus heap: everything a value graph refers to.
#[derive(Debug, Clone, Default)]
pub struct Store {
    types: TypeTable,
    heap: Heap,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_types(types: TypeTable) -> Self {
        Self {
            types,
            heap: Heap::new(),
        }
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeTable {
        &mut self.types
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub(crate) fn split_mut(&mut self) -> (&TypeTable, &mut Heap) {
        (&self.types, &mut self.heap)
    }

    /// Moves `value` into a new cell and returns a pointer to it.
    pub fn alloc(&mut self, value: Value) -> Result<Value, TypeError> {
        let ty = self.types.pointer(value.ty())?;
        let handle = self.heap.alloc(value);
        Ok(Value::pointer(ty, Some(handle)))
    }

    /// Allocates the zero value of `ty` and returns a pointer to it.
    pub fn alloc_zeroed(&mut self, ty: TypeId) -> Result<Value, TypeError> {
        let zero = self.types.zero(ty)?;
        self.alloc(zero)
    }

    /// Follows one pointer.
    pub fn load(&self, pointer: &Value) -> Option<&Value> {
        let handle = pointer.as_pointer().ok()??;
        self.heap.get(handle)
    }

    pub fn load_mut(&mut self, pointer: &Value) -> Option<&mut Value> {
        let handle = pointer.as_pointer().ok()??;
        self.heap.get_mut(handle)
    }

    /// Structural equality that follows pointers, see [`Heap::deep_equal`].
    pub fn deep_equal(&self, a: &Value, b: &Value) -> bool {
        self.heap.deep_equal(a, b)
    }
}
