// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Which kinds may be copied into which, and how numbers change width on the way.

use crate::flags::Flags;
use crate::types::{Kind, KindClass};
use crate::value::{Complex, Data, Key};

use num_traits::AsPrimitive;

/// How a permitted copy is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Same scalar kind; the value is assigned as is.
    Direct,
    /// Same numeric family, different width.
    Numeric,
    /// Struct fields are matched by name.
    Record,
    /// A fresh map is filled entry by entry.
    Mapping,
    /// Arrays and slices, length adjusted.
    Sequence,
    /// Opaque kinds and any-boxes; the destination shares the source's referent.
    Shared,
}

/// Decides whether a `src` value can be copied into a `dst` slot.
///
/// Pointers never reach this table: they are followed (and allocated on the destination side)
/// before kinds are compared.
pub fn can_copy(dst: Kind, src: Kind, flags: Flags) -> Option<CopyMode> {
    if dst == src {
        return match dst {
            Kind::Chan => flags.copy_chan.then_some(CopyMode::Shared),
            Kind::Func => flags.copy_func.then_some(CopyMode::Shared),
            Kind::Uintptr => flags.copy_uintptr.then_some(CopyMode::Shared),
            Kind::UnsafePointer => flags.copy_unsafe_pointer.then_some(CopyMode::Shared),
            Kind::Interface => flags.copy_interface.then_some(CopyMode::Shared),
            Kind::Pointer | Kind::Invalid => None,
            Kind::Struct => Some(CopyMode::Record),
            Kind::Map => Some(CopyMode::Mapping),
            Kind::Array | Kind::Slice => Some(CopyMode::Sequence),
            _ => Some(CopyMode::Direct),
        };
    }

    match (dst.class(), src.class()) {
        (KindClass::SignedInteger, KindClass::SignedInteger)
        | (KindClass::UnsignedInteger, KindClass::UnsignedInteger)
        | (KindClass::FloatingPoint, KindClass::FloatingPoint)
        | (KindClass::Complex, KindClass::Complex) => Some(CopyMode::Numeric),
        (KindClass::Sequence, KindClass::Sequence) => Some(CopyMode::Sequence),
        _ => None,
    }
}

/// Truncates (or sign-extends) a signed integer to the width of `to`.
pub fn convert_int(value: i64, to: Kind) -> i64 {
    match to {
        Kind::Int8 => i64::from(AsPrimitive::<i8>::as_(value)),
        Kind::Int16 => i64::from(AsPrimitive::<i16>::as_(value)),
        Kind::Int32 => i64::from(AsPrimitive::<i32>::as_(value)),
        Kind::Int => AsPrimitive::<i64>::as_(AsPrimitive::<isize>::as_(value)),
        _ => value,
    }
}

/// Truncates an unsigned integer to the width of `to`.
pub fn convert_uint(value: u64, to: Kind) -> u64 {
    match to {
        Kind::Uint8 => u64::from(AsPrimitive::<u8>::as_(value)),
        Kind::Uint16 => u64::from(AsPrimitive::<u16>::as_(value)),
        Kind::Uint32 => u64::from(AsPrimitive::<u32>::as_(value)),
        Kind::Uint | Kind::Uintptr => AsPrimitive::<u64>::as_(AsPrimitive::<usize>::as_(value)),
        _ => value,
    }
}

/// Rounds to single precision when `to` is `float32`.
pub fn convert_float(value: f64, to: Kind) -> f64 {
    match to {
        Kind::Float32 => f64::from(AsPrimitive::<f32>::as_(value)),
        _ => value,
    }
}

pub fn convert_complex(value: Complex, to: Kind) -> Complex {
    let to = match to {
        Kind::Complex64 => Kind::Float32,
        _ => Kind::Float64,
    };
    Complex::new(convert_float(value.re, to), convert_float(value.im, to))
}

/// Scalar assignment of `src` into a slot of kind `dst`, or `None` when the representations
/// do not belong to the same family.
pub fn convert_scalar(dst: Kind, src: &Data) -> Option<Data> {
    let data = match (dst.class(), src) {
        (KindClass::Text, Data::String(s)) => Data::String(s.clone()),
        (KindClass::Boolean, Data::Bool(b)) => Data::Bool(*b),
        (KindClass::SignedInteger, Data::Int(n)) => Data::Int(convert_int(*n, dst)),
        (KindClass::UnsignedInteger, Data::Uint(n)) => Data::Uint(convert_uint(*n, dst)),
        (KindClass::FloatingPoint, Data::Float(n)) => Data::Float(convert_float(*n, dst)),
        (KindClass::Complex, Data::Complex(c)) => Data::Complex(convert_complex(*c, dst)),
        _ => return None,
    };
    Some(data)
}

/// Converts a map key between key kinds. Keys follow the same rules as values: identical kinds
/// or the same numeric family.
pub fn convert_key(key: &Key, to: Kind, from: Kind) -> Option<Key> {
    if to != from && (to.class() != from.class() || to.class() == KindClass::Opaque) {
        return None;
    }
    let key = match key {
        Key::Int(n) => Key::Int(convert_int(*n, to)),
        Key::Uint(n) => Key::Uint(convert_uint(*n, to)),
        other => other.clone(),
    };
    Some(key)
}
