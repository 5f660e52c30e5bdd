// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod coerce;
mod compare;
mod copier;
mod engine;
mod error;
mod flags;
mod heap;
mod resolve;
mod tracker;
mod types;
mod value;

// Shared payloads switch to atomic reference counting when values must cross threads.
#[cfg(feature = "arc")]
pub(crate) use std::sync::Arc as Rc;
#[cfg(not(feature = "arc"))]
pub(crate) use std::rc::Rc;

pub use copier::{deep_copy, CopyConfig, Copier, DEFAULT_MAX_DEPTH};
pub use error::CopyError;
pub use flags::Flags;
pub use heap::{Handle, Heap, Store};
pub use types::{Field, Kind, KindClass, StructType, Type, TypeError, TypeId, TypeTable};
pub use value::{Channel, Complex, Data, Func, Key, Value};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::coerce::*;
    pub use crate::engine::*;
    pub use crate::resolve::*;
    pub use crate::tracker::*;
}

#[cfg(test)]
mod tests;
