// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]

use crate::engine::CopyEngine;
use crate::*;

use anyhow::Result;

fn node_type(store: &mut Store) -> Result<(TypeId, TypeId)> {
    let types = store.types_mut();
    let node = types.declare_struct("node")?;
    let node_ptr = types.pointer(node)?;
    types.define_struct(
        node,
        vec![Field::new("V", TypeId::INT), Field::new("Next", node_ptr)],
    )?;
    Ok((node, node_ptr))
}

#[test]
fn mismatched_data_is_unsupported() -> Result<()> {
    let mut store = Store::new();
    let dst = store.alloc_zeroed(TypeId::INT)?;
    let src = Value::from_parts(TypeId::INT, Data::String("x".into()));

    let err = deep_copy(&mut store, &dst, &src, &[]).unwrap_err();
    assert_eq!(
        err,
        CopyError::UnsupportedKind {
            kind: Kind::Int,
            ty: "int".to_string()
        }
    );
    Ok(())
}

#[test]
fn declared_only_struct_is_unsupported() -> Result<()> {
    let mut store = Store::new();
    let later = store.types_mut().declare_struct("later")?;
    let dst = store.alloc_zeroed(TypeId::INT)?;
    let src = Value::new_struct(later, vec![]);

    let err = deep_copy(&mut store, &dst, &src, &[]).unwrap_err();
    assert!(matches!(err, CopyError::UnsupportedKind { kind: Kind::Invalid, .. }));
    assert_eq!(err.to_string(), "unsupported kind 'invalid' for value of type 'later'");
    Ok(())
}

#[test]
fn dangling_destination() -> Result<()> {
    let mut store = Store::new();
    let ptr_ty = store.types_mut().pointer(TypeId::INT)?;
    let mut other = Heap::new();
    other.alloc(Value::invalid());
    let far = other.alloc(Value::invalid());

    let dst = Value::pointer(ptr_ty, Some(far));
    let err = deep_copy(&mut store, &dst, &Value::from(1isize), &[]).unwrap_err();
    assert_eq!(err, CopyError::DanglingPointer(far));
    Ok(())
}

#[test]
fn copy_onto_itself() -> Result<()> {
    let mut store = Store::new();
    let (node, _) = node_type(&mut store)?;
    let ptr = store.alloc_zeroed(node)?;
    let before = {
        let cell = store.load_mut(&ptr).unwrap();
        let fields = cell.as_fields_mut()?;
        fields[0] = Value::from(5isize);
        fields[1] = ptr.clone();
        cell.clone()
    };

    for flags in [Flags::NONE, Flags::ALL] {
        deep_copy(&mut store, &ptr, &ptr, &[flags])?;
        assert_eq!(store.load(&ptr), Some(&before));
    }
    // Nothing new was allocated; the cell being written is never read back as a source.
    assert_eq!(store.heap().len(), 1);
    Ok(())
}

#[test]
fn zero_depth_copies_nothing() -> Result<()> {
    let mut store = Store::new();
    let src = store.alloc(Value::from(3u8))?;
    let dst = store.alloc_zeroed(TypeId::UINT8)?;

    let (types, heap) = store.split_mut();
    CopyEngine::new(types, heap, Flags::NONE, 0).run(&dst, &src)?;
    assert_eq!(store.load(&dst), Some(&Value::from(0u8)));

    let (types, heap) = store.split_mut();
    CopyEngine::new(types, heap, Flags::NONE, 1).run(&dst, &src)?;
    assert_eq!(store.load(&dst), Some(&Value::from(3u8)));
    Ok(())
}

#[test]
fn cycle_without_preservation_terminates() -> Result<()> {
    let mut store = Store::new();
    let (node, _) = node_type(&mut store)?;

    // a -> b -> a
    let a = store.alloc_zeroed(node)?;
    let b = store.alloc_zeroed(node)?;
    store.load_mut(&a).unwrap().as_fields_mut()?[1] = b.clone();
    store.load_mut(&b).unwrap().as_fields_mut()?[1] = a.clone();

    let dst = store.alloc_zeroed(node)?;
    deep_copy(&mut store, &dst, &a, &[])?;

    // The copy closes its own cycle instead of pointing back into the source.
    let second = store.load(&dst).unwrap().as_fields()?[1].clone();
    let back = store.load(&second).unwrap().as_fields()?[1].clone();
    assert_eq!(back, dst);
    assert_ne!(second, b);
    assert!(store.deep_equal(&dst, &a));
    Ok(())
}
