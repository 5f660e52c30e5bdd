// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::as_conversions)]

use crate::heap::Handle;
use crate::types::{Kind, KindClass, TypeId};
use crate::Rc;

use core::fmt;
use std::collections::{BTreeMap, VecDeque};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// Map key. Narrow integer keys hold values representable in the map's key type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(Rc<str>),
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<u64> for Key {
    fn from(n: u64) -> Self {
        Key::Uint(n)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.into())
    }
}

struct ChannelState {
    capacity: usize,
    queue: spin::Mutex<VecDeque<Value>>,
}

/// Buffered channel. Copies share the same channel; they never clone its contents.
#[derive(Clone)]
pub struct Channel(Rc<ChannelState>);

impl Channel {
    pub fn new(capacity: usize) -> Self {
        Channel(Rc::new(ChannelState {
            capacity,
            queue: spin::Mutex::new(VecDeque::with_capacity(capacity)),
        }))
    }

    pub fn capacity(&self) -> usize {
        self.0.capacity
    }

    pub fn len(&self) -> usize {
        self.0.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hands the value back when the buffer is full.
    pub fn try_send(&self, value: Value) -> core::result::Result<(), Value> {
        let mut queue = self.0.queue.lock();
        if queue.len() >= self.0.capacity {
            return Err(value);
        }
        queue.push_back(value);
        Ok(())
    }

    pub fn try_recv(&self) -> Option<Value> {
        self.0.queue.lock().pop_front()
    }

    pub fn ptr_eq(&self, other: &Channel) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "chan@{:p}", Rc::as_ptr(&self.0))
    }
}

#[cfg(feature = "arc")]
type FuncBody = dyn Fn(&[Value]) -> Vec<Value> + Send + Sync;
#[cfg(not(feature = "arc"))]
type FuncBody = dyn Fn(&[Value]) -> Vec<Value>;

/// Callable value. Like channels, functions are shared by copies, never cloned.
#[derive(Clone)]
pub struct Func(Rc<FuncBody>);

impl Func {
    #[cfg(feature = "arc")]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        Func(Rc::new(f))
    }

    #[cfg(not(feature = "arc"))]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<Value> + 'static,
    {
        Func(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Vec<Value> {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Func) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "func@{:p}", Rc::as_ptr(&self.0).cast::<()>())
    }
}

// Aggregates are reference counted and copy-on-write, so cloning a Value never walks its contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Invalid,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(Complex),
    String(Rc<str>),
    Struct(Rc<Vec<Value>>),
    Array(Rc<Vec<Value>>),
    Slice(Option<Rc<Vec<Value>>>),
    Map(Option<Rc<BTreeMap<Key, Value>>>),
    Pointer(Option<Handle>),
    Interface(Option<Rc<Value>>),
    Chan(Option<Channel>),
    Func(Option<Func>),
    Uintptr(usize),
    UnsafePointer(Option<Handle>),
}

impl Data {
    /// Whether this representation is the one used for values of `kind`.
    pub fn matches(&self, kind: Kind) -> bool {
        match (self, kind.class()) {
            (Data::Invalid, KindClass::Invalid) => true,
            (Data::Bool(_), KindClass::Boolean) => true,
            (Data::Int(_), KindClass::SignedInteger) => true,
            (Data::Uint(_), KindClass::UnsignedInteger) => true,
            (Data::Float(_), KindClass::FloatingPoint) => true,
            (Data::Complex(_), KindClass::Complex) => true,
            (Data::String(_), KindClass::Text) => true,
            (Data::Struct(_), KindClass::Record) => true,
            (Data::Map(_), KindClass::Mapping) => true,
            (Data::Array(_), _) => kind == Kind::Array,
            (Data::Slice(_), _) => kind == Kind::Slice,
            (Data::Pointer(_), _) => kind == Kind::Pointer,
            (Data::Interface(_), _) => kind == Kind::Interface,
            (Data::Chan(_), _) => kind == Kind::Chan,
            (Data::Func(_), _) => kind == Kind::Func,
            (Data::Uintptr(_), _) => kind == Kind::Uintptr,
            (Data::UnsafePointer(_), _) => kind == Kind::UnsafePointer,
            _ => false,
        }
    }
}

/// A typed runtime value. The type id refers to the [`TypeTable`](crate::TypeTable) of the
/// store the value belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    ty: TypeId,
    data: Data,
}

impl Default for Value {
    fn default() -> Self {
        Value::invalid()
    }
}

impl Value {
    /// The absent value: nothing to copy from and nothing to write to.
    pub const fn invalid() -> Value {
        Value {
            ty: TypeId::INVALID,
            data: Data::Invalid,
        }
    }

    /// Builds a value without checking `data` against `ty`. A mismatch is reported by the copy
    /// engine as an unsupported kind when the value is reached.
    pub const fn from_parts(ty: TypeId, data: Data) -> Value {
        Value { ty, data }
    }

    pub fn ty(&self) -> TypeId {
        self.ty
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Data {
        &mut self.data
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.data, Data::Invalid)
    }

    pub fn complex64(re: f32, im: f32) -> Value {
        Value::from_parts(
            TypeId::COMPLEX64,
            Data::Complex(Complex::new(f64::from(re), f64::from(im))),
        )
    }

    pub fn complex128(re: f64, im: f64) -> Value {
        Value::from_parts(TypeId::COMPLEX128, Data::Complex(Complex::new(re, im)))
    }

    pub fn uintptr(addr: usize) -> Value {
        Value::from_parts(TypeId::UINTPTR, Data::Uintptr(addr))
    }

    pub fn unsafe_pointer(target: Option<Handle>) -> Value {
        Value::from_parts(TypeId::UNSAFE_POINTER, Data::UnsafePointer(target))
    }

    pub fn pointer(ty: TypeId, target: Option<Handle>) -> Value {
        Value::from_parts(ty, Data::Pointer(target))
    }

    pub fn new_struct(ty: TypeId, fields: Vec<Value>) -> Value {
        Value::from_parts(ty, Data::Struct(Rc::new(fields)))
    }

    pub fn new_array(ty: TypeId, elems: Vec<Value>) -> Value {
        Value::from_parts(ty, Data::Array(Rc::new(elems)))
    }

    pub fn new_slice(ty: TypeId, elems: Vec<Value>) -> Value {
        Value::from_parts(ty, Data::Slice(Some(Rc::new(elems))))
    }

    pub fn nil_slice(ty: TypeId) -> Value {
        Value::from_parts(ty, Data::Slice(None))
    }

    pub fn new_map(ty: TypeId, entries: BTreeMap<Key, Value>) -> Value {
        Value::from_parts(ty, Data::Map(Some(Rc::new(entries))))
    }

    pub fn nil_map(ty: TypeId) -> Value {
        Value::from_parts(ty, Data::Map(None))
    }

    pub fn new_interface(ty: TypeId, inner: Option<Value>) -> Value {
        Value::from_parts(ty, Data::Interface(inner.map(Rc::new)))
    }

    pub fn chan(ty: TypeId, chan: Option<Channel>) -> Value {
        Value::from_parts(ty, Data::Chan(chan))
    }

    pub fn func(ty: TypeId, func: Option<Func>) -> Value {
        Value::from_parts(ty, Data::Func(func))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_parts(TypeId::BOOL, Data::Bool(b))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from_parts(TypeId::STRING, Data::String(s.into()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::from_parts(TypeId::STRING, Data::String(s.into()))
    }
}

macro_rules! from_signed {
    ($($t:ty => $id:expr),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::from_parts($id, Data::Int(n as i64))
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty => $id:expr),* $(,)?) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::from_parts($id, Data::Uint(n as u64))
            }
        })*
    };
}

from_signed!(i8 => TypeId::INT8, i16 => TypeId::INT16, i32 => TypeId::INT32, i64 => TypeId::INT64, isize => TypeId::INT);
from_unsigned!(u8 => TypeId::UINT8, u16 => TypeId::UINT16, u32 => TypeId::UINT32, u64 => TypeId::UINT64, usize => TypeId::UINT);

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::from_parts(TypeId::FLOAT32, Data::Float(f64::from(n)))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::from_parts(TypeId::FLOAT64, Data::Float(n))
    }
}

impl Value {
    pub fn as_bool(&self) -> Result<bool> {
        match &self.data {
            Data::Bool(b) => Ok(*b),
            _ => Err(anyhow!("not a bool")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match &self.data {
            Data::Int(n) => Ok(*n),
            _ => Err(anyhow!("not a signed integer")),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        match &self.data {
            Data::Uint(n) => Ok(*n),
            _ => Err(anyhow!("not an unsigned integer")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match &self.data {
            Data::Float(n) => Ok(*n),
            _ => Err(anyhow!("not a float")),
        }
    }

    pub fn as_complex(&self) -> Result<Complex> {
        match &self.data {
            Data::Complex(c) => Ok(*c),
            _ => Err(anyhow!("not a complex number")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match &self.data {
            Data::String(s) => Ok(s),
            _ => Err(anyhow!("not a string")),
        }
    }

    pub fn as_fields(&self) -> Result<&Vec<Value>> {
        match &self.data {
            Data::Struct(f) => Ok(f),
            _ => Err(anyhow!("not a struct")),
        }
    }

    pub fn as_fields_mut(&mut self) -> Result<&mut Vec<Value>> {
        match &mut self.data {
            Data::Struct(f) => Ok(Rc::make_mut(f)),
            _ => Err(anyhow!("not a struct")),
        }
    }

    /// Elements of an array or slice. A nil slice has no elements.
    pub fn as_elems(&self) -> Result<&[Value]> {
        match &self.data {
            Data::Array(a) | Data::Slice(Some(a)) => Ok(a),
            Data::Slice(None) => Ok(&[]),
            _ => Err(anyhow!("not an array or slice")),
        }
    }

    pub fn as_elems_mut(&mut self) -> Result<&mut Vec<Value>> {
        match &mut self.data {
            Data::Array(a) | Data::Slice(Some(a)) => Ok(Rc::make_mut(a)),
            _ => Err(anyhow!("not an array or non-nil slice")),
        }
    }

    pub fn as_map(&self) -> Result<Option<&BTreeMap<Key, Value>>> {
        match &self.data {
            Data::Map(m) => Ok(m.as_deref()),
            _ => Err(anyhow!("not a map")),
        }
    }

    pub fn as_pointer(&self) -> Result<Option<Handle>> {
        match &self.data {
            Data::Pointer(h) => Ok(*h),
            _ => Err(anyhow!("not a pointer")),
        }
    }

    pub fn as_interface(&self) -> Result<Option<&Value>> {
        match &self.data {
            Data::Interface(v) => Ok(v.as_deref()),
            _ => Err(anyhow!("not an interface")),
        }
    }

    pub fn as_chan(&self) -> Result<Option<&Channel>> {
        match &self.data {
            Data::Chan(c) => Ok(c.as_ref()),
            _ => Err(anyhow!("not a channel")),
        }
    }

    pub fn as_func(&self) -> Result<Option<&Func>> {
        match &self.data {
            Data::Func(f) => Ok(f.as_ref()),
            _ => Err(anyhow!("not a function")),
        }
    }

    pub fn as_uintptr(&self) -> Result<usize> {
        match &self.data {
            Data::Uintptr(a) => Ok(*a),
            _ => Err(anyhow!("not a uintptr")),
        }
    }

    pub fn as_unsafe_pointer(&self) -> Result<Option<Handle>> {
        match &self.data {
            Data::UnsafePointer(h) => Ok(*h),
            _ => Err(anyhow!("not an unsafe pointer")),
        }
    }

    /// Whether the value equals the zero value of its kind.
    pub fn is_zero(&self) -> bool {
        match &self.data {
            Data::Invalid => true,
            Data::Bool(b) => !*b,
            Data::Int(n) => *n == 0,
            Data::Uint(n) => *n == 0,
            Data::Float(n) => *n == 0.0,
            Data::Complex(c) => c.re == 0.0 && c.im == 0.0,
            Data::String(s) => s.is_empty(),
            Data::Struct(f) | Data::Array(f) => f.iter().all(Value::is_zero),
            Data::Slice(s) => s.is_none(),
            Data::Map(m) => m.is_none(),
            Data::Pointer(h) | Data::UnsafePointer(h) => h.is_none(),
            Data::Interface(v) => v.is_none(),
            Data::Chan(c) => c.is_none(),
            Data::Func(f) => f.is_none(),
            Data::Uintptr(a) => *a == 0,
        }
    }
}
