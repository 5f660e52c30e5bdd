// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

//! Values copied by the engine carry no compile-time type information. Every value instead names a
//! [`TypeId`] in a [`TypeTable`], and the table describes the structural shape behind that id:
//! the kind, struct fields, element, key and value types.
//!
//! Composite types (arrays, slices, maps, pointers, channels, functions, interfaces) are interned
//! structurally: asking twice for `[]int16` yields the same id. Struct types are nominal. A struct
//! may be declared first and defined later, which is how self-referential types are built:
//!
//! ```rust
//! use replica::*;
//!
//! let mut types = TypeTable::new();
//! let node = types.declare_struct("node").unwrap();
//! let node_ptr = types.pointer(node).unwrap();
//! types
//!     .define_struct(
//!         node,
//!         vec![
//!             Field::new("Name", TypeId::STRING),
//!             Field::new("Next", node_ptr),
//!         ],
//!     )
//!     .unwrap();
//! assert_eq!(types.name(node_ptr), "*node");
//! ```

use crate::value::{Data, Value};
use crate::Rc;

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural category of a runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Array,
    Chan,
    Func,
    Interface,
    Map,
    Pointer,
    Slice,
    String,
    Struct,
    UnsafePointer,
}

/// Coarse grouping of kinds used when deciding whether two kinds may be copied into each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindClass {
    Text,
    Boolean,
    SignedInteger,
    UnsignedInteger,
    FloatingPoint,
    Complex,
    Record,
    Mapping,
    Sequence,
    Reference,
    Opaque,
    Invalid,
}

impl Kind {
    pub fn class(self) -> KindClass {
        match self {
            Kind::String => KindClass::Text,
            Kind::Bool => KindClass::Boolean,
            Kind::Int | Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64 => {
                KindClass::SignedInteger
            }
            Kind::Uint | Kind::Uint8 | Kind::Uint16 | Kind::Uint32 | Kind::Uint64 => {
                KindClass::UnsignedInteger
            }
            Kind::Float32 | Kind::Float64 => KindClass::FloatingPoint,
            Kind::Complex64 | Kind::Complex128 => KindClass::Complex,
            Kind::Struct => KindClass::Record,
            Kind::Map => KindClass::Mapping,
            Kind::Array | Kind::Slice => KindClass::Sequence,
            Kind::Pointer | Kind::Interface => KindClass::Reference,
            Kind::Chan | Kind::Func | Kind::Uintptr | Kind::UnsafePointer => KindClass::Opaque,
            Kind::Invalid => KindClass::Invalid,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uintptr => "uintptr",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::Array => "array",
            Kind::Chan => "chan",
            Kind::Func => "func",
            Kind::Interface => "interface",
            Kind::Map => "map",
            Kind::Pointer => "ptr",
            Kind::Slice => "slice",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::UnsafePointer => "unsafe.Pointer",
        }
    }

    /// Kinds usable as map keys.
    pub fn is_comparable_key(self) -> bool {
        matches!(
            self.class(),
            KindClass::Boolean
                | KindClass::Text
                | KindClass::SignedInteger
                | KindClass::UnsignedInteger
        ) || self == Kind::Uintptr
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle to a type descriptor stored in a [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(u32);

// Order must match the predeclared ids below.
const PREDECLARED: [Kind; 19] = [
    Kind::Invalid,
    Kind::Bool,
    Kind::Int,
    Kind::Int8,
    Kind::Int16,
    Kind::Int32,
    Kind::Int64,
    Kind::Uint,
    Kind::Uint8,
    Kind::Uint16,
    Kind::Uint32,
    Kind::Uint64,
    Kind::Uintptr,
    Kind::Float32,
    Kind::Float64,
    Kind::Complex64,
    Kind::Complex128,
    Kind::String,
    Kind::UnsafePointer,
];

impl TypeId {
    pub const INVALID: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const INT8: TypeId = TypeId(3);
    pub const INT16: TypeId = TypeId(4);
    pub const INT32: TypeId = TypeId(5);
    pub const INT64: TypeId = TypeId(6);
    pub const UINT: TypeId = TypeId(7);
    pub const UINT8: TypeId = TypeId(8);
    pub const UINT16: TypeId = TypeId(9);
    pub const UINT32: TypeId = TypeId(10);
    pub const UINT64: TypeId = TypeId(11);
    pub const UINTPTR: TypeId = TypeId(12);
    pub const FLOAT32: TypeId = TypeId(13);
    pub const FLOAT64: TypeId = TypeId(14);
    pub const COMPLEX64: TypeId = TypeId(15);
    pub const COMPLEX128: TypeId = TypeId(16);
    pub const STRING: TypeId = TypeId(17);
    pub const UNSAFE_POINTER: TypeId = TypeId(18);
    /// The empty interface, able to box a value of any type.
    pub const ANY: TypeId = TypeId(19);

    /// Predeclared id of a basic (non-composite) kind.
    pub fn basic(kind: Kind) -> Option<TypeId> {
        PREDECLARED
            .iter()
            .position(|k| *k == kind)
            .and_then(|idx| u32::try_from(idx).ok())
            .map(TypeId)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named struct field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Field {
    pub name: Rc<str>,
    pub ty: TypeId,
    /// Private fields are never written by a copy.
    pub exported: bool,
}

impl Field {
    pub fn new(name: &str, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            exported: true,
        }
    }

    pub fn private(name: &str, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            exported: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StructType {
    pub name: Rc<str>,
    pub fields: Vec<Field>,
}

impl StructType {
    /// Index of the field with exactly this name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name.as_ref() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Type {
    Basic(Kind),
    Array {
        elem: TypeId,
        len: usize,
    },
    Slice {
        elem: TypeId,
    },
    Map {
        key: TypeId,
        value: TypeId,
    },
    Pointer {
        elem: TypeId,
    },
    Chan {
        elem: TypeId,
    },
    Func {
        params: Vec<TypeId>,
        results: Vec<TypeId>,
    },
    Interface {
        name: Rc<str>,
    },
    Struct(StructType),
    /// A struct whose name is reserved but whose fields are not yet known.
    Declared {
        name: Rc<str>,
    },
}

impl Type {
    pub fn kind(&self) -> Kind {
        match self {
            Type::Basic(k) => *k,
            Type::Array { .. } => Kind::Array,
            Type::Slice { .. } => Kind::Slice,
            Type::Map { .. } => Kind::Map,
            Type::Pointer { .. } => Kind::Pointer,
            Type::Chan { .. } => Kind::Chan,
            Type::Func { .. } => Kind::Func,
            Type::Interface { .. } => Kind::Interface,
            Type::Struct(_) => Kind::Struct,
            Type::Declared { .. } => Kind::Invalid,
        }
    }
}

/// Errors raised while building types or zero values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("unknown type id {0:?}")]
    UnknownType(TypeId),
    #[error("a type named '{0}' already exists")]
    DuplicateName(Rc<str>),
    #[error("struct '{ty}' has more than one field named '{field}'")]
    DuplicateField { ty: Rc<str>, field: Rc<str> },
    #[error("type '{0}' is already defined")]
    AlreadyDefined(Rc<str>),
    #[error("'{0}' is not a declared struct")]
    NotDeclared(Rc<str>),
    #[error("'{0}' cannot be used as a map key")]
    InvalidMapKey(Rc<str>),
    #[error("type '{0}' is not defined yet and cannot be embedded by value")]
    Incomplete(Rc<str>),
    #[error("type '{0}' is declared but never defined")]
    Undefined(Rc<str>),
}

/// Arena of type descriptors.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Type>,
    interned: BTreeMap<Type, TypeId>,
    structs: BTreeMap<Rc<str>, TypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            types: PREDECLARED.iter().map(|k| Type::Basic(*k)).collect(),
            interned: BTreeMap::new(),
            structs: BTreeMap::new(),
        };
        for (idx, kind) in PREDECLARED.iter().enumerate() {
            let id = TypeId(idx as u32);
            table.interned.insert(Type::Basic(*kind), id);
        }
        let any = table.interface("any");
        debug_assert_eq!(any, TypeId::ANY);
        table
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.index())
    }

    /// Kind of the type. Unknown ids and declared-only structs report [`Kind::Invalid`].
    pub fn kind(&self, id: TypeId) -> Kind {
        self.get(id).map_or(Kind::Invalid, Type::kind)
    }

    pub fn as_struct(&self, id: TypeId) -> Option<&StructType> {
        match self.get(id) {
            Some(Type::Struct(s)) => Some(s),
            _ => None,
        }
    }

    /// Element type of arrays, slices, pointers and channels.
    pub fn elem(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id)? {
            Type::Array { elem, .. }
            | Type::Slice { elem }
            | Type::Pointer { elem }
            | Type::Chan { elem } => Some(*elem),
            _ => None,
        }
    }

    /// Struct lookup by name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.structs.get(name).copied()
    }

    /// Human readable type name, e.g. `map[string][]*node`.
    pub fn name(&self, id: TypeId) -> String {
        match self.get(id) {
            None => format!("<unknown {}>", id.0),
            Some(Type::Basic(k)) => k.name().to_string(),
            Some(Type::Array { elem, len }) => format!("[{len}]{}", self.name(*elem)),
            Some(Type::Slice { elem }) => format!("[]{}", self.name(*elem)),
            Some(Type::Map { key, value }) => {
                format!("map[{}]{}", self.name(*key), self.name(*value))
            }
            Some(Type::Pointer { elem }) => format!("*{}", self.name(*elem)),
            Some(Type::Chan { elem }) => format!("chan {}", self.name(*elem)),
            Some(Type::Func { params, results }) => {
                let params: Vec<String> = params.iter().map(|p| self.name(*p)).collect();
                let results: Vec<String> = results.iter().map(|r| self.name(*r)).collect();
                match results.len() {
                    0 => format!("func({})", params.join(", ")),
                    1 => format!("func({}) {}", params.join(", "), results[0]),
                    _ => format!("func({}) ({})", params.join(", "), results.join(", ")),
                }
            }
            Some(Type::Interface { name }) => name.to_string(),
            Some(Type::Struct(s)) => s.name.to_string(),
            Some(Type::Declared { name }) => name.to_string(),
        }
    }

    fn check(&self, id: TypeId) -> Result<(), TypeError> {
        match self.get(id) {
            Some(_) => Ok(()),
            None => Err(TypeError::UnknownType(id)),
        }
    }

    fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(id) = self.interned.get(&ty) {
            return *id;
        }
        let id = self.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    fn push(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn array(&mut self, elem: TypeId, len: usize) -> Result<TypeId, TypeError> {
        self.check(elem)?;
        self.require_complete(elem)?;
        Ok(self.intern(Type::Array { elem, len }))
    }

    pub fn slice(&mut self, elem: TypeId) -> Result<TypeId, TypeError> {
        self.check(elem)?;
        Ok(self.intern(Type::Slice { elem }))
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> Result<TypeId, TypeError> {
        self.check(key)?;
        self.check(value)?;
        if !self.kind(key).is_comparable_key() {
            return Err(TypeError::InvalidMapKey(self.name(key).into()));
        }
        Ok(self.intern(Type::Map { key, value }))
    }

    pub fn pointer(&mut self, elem: TypeId) -> Result<TypeId, TypeError> {
        self.check(elem)?;
        Ok(self.intern(Type::Pointer { elem }))
    }

    pub fn chan(&mut self, elem: TypeId) -> Result<TypeId, TypeError> {
        self.check(elem)?;
        Ok(self.intern(Type::Chan { elem }))
    }

    pub fn func(&mut self, params: Vec<TypeId>, results: Vec<TypeId>) -> Result<TypeId, TypeError> {
        for id in params.iter().chain(results.iter()) {
            self.check(*id)?;
        }
        Ok(self.intern(Type::Func { params, results }))
    }

    /// Interface types are identified by name.
    pub fn interface(&mut self, name: &str) -> TypeId {
        self.intern(Type::Interface { name: name.into() })
    }

    /// Reserves a struct name so that pointers to it can be formed before its fields are known.
    pub fn declare_struct(&mut self, name: &str) -> Result<TypeId, TypeError> {
        let name: Rc<str> = name.into();
        if self.structs.contains_key(&name) {
            return Err(TypeError::DuplicateName(name));
        }
        let id = self.push(Type::Declared { name: name.clone() });
        self.structs.insert(name, id);
        Ok(id)
    }

    pub fn define_struct(&mut self, id: TypeId, fields: Vec<Field>) -> Result<(), TypeError> {
        let name = match self.get(id) {
            Some(Type::Declared { name }) => name.clone(),
            Some(Type::Struct(s)) => return Err(TypeError::AlreadyDefined(s.name.clone())),
            Some(_) => return Err(TypeError::NotDeclared(self.name(id).into())),
            None => return Err(TypeError::UnknownType(id)),
        };

        for (idx, field) in fields.iter().enumerate() {
            self.check(field.ty)?;
            // By-value fields must already be complete. This also rules out a struct
            // containing itself, since it is still only declared here.
            self.require_complete(field.ty)?;
            if fields[..idx].iter().any(|f| f.name == field.name) {
                return Err(TypeError::DuplicateField {
                    ty: name,
                    field: field.name.clone(),
                });
            }
        }

        self.types[id.index()] = Type::Struct(StructType { name, fields });
        Ok(())
    }

    pub fn new_struct(&mut self, name: &str, fields: Vec<Field>) -> Result<TypeId, TypeError> {
        let id = self.declare_struct(name)?;
        self.define_struct(id, fields)?;
        Ok(id)
    }

    fn require_complete(&self, id: TypeId) -> Result<(), TypeError> {
        match self.get(id) {
            Some(Type::Declared { name }) => Err(TypeError::Incomplete(name.clone())),
            Some(Type::Array { elem, .. }) => self.require_complete(*elem),
            Some(_) => Ok(()),
            None => Err(TypeError::UnknownType(id)),
        }
    }

    /// The zero value of a type: empty strings, zero numbers, nil references, zeroed aggregates.
    pub fn zero(&self, id: TypeId) -> Result<Value, TypeError> {
        let data = match self.get(id) {
            None => return Err(TypeError::UnknownType(id)),
            Some(Type::Basic(kind)) => match kind.class() {
                KindClass::Text => Data::String("".into()),
                KindClass::Boolean => Data::Bool(false),
                KindClass::SignedInteger => Data::Int(0),
                KindClass::UnsignedInteger => Data::Uint(0),
                KindClass::FloatingPoint => Data::Float(0.0),
                KindClass::Complex => Data::Complex(Default::default()),
                _ => match kind {
                    Kind::Uintptr => Data::Uintptr(0),
                    Kind::UnsafePointer => Data::UnsafePointer(None),
                    _ => Data::Invalid,
                },
            },
            Some(Type::Array { elem, len }) => {
                Data::Array(Rc::new(vec![self.zero(*elem)?; *len]))
            }
            Some(Type::Slice { .. }) => Data::Slice(None),
            Some(Type::Map { .. }) => Data::Map(None),
            Some(Type::Pointer { .. }) => Data::Pointer(None),
            Some(Type::Chan { .. }) => Data::Chan(None),
            Some(Type::Func { .. }) => Data::Func(None),
            Some(Type::Interface { .. }) => Data::Interface(None),
            Some(Type::Struct(s)) => Data::Struct(Rc::new(
                s.fields
                    .iter()
                    .map(|f| self.zero(f.ty))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Some(Type::Declared { name }) => return Err(TypeError::Undefined(name.clone())),
        };
        Ok(Value::from_parts(id, data))
    }
}
