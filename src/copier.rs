// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::engine::CopyEngine;
use crate::error::CopyError;
use crate::flags::Flags;
use crate::heap::Store;
use crate::value::Value;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Depth limit used when none is configured. Large enough to never be reached.
pub const DEFAULT_MAX_DEPTH: usize = usize::MAX;

/// Settings of a [`Copier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CopyConfig {
    pub flags: Flags,
    pub max_depth: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            flags: Flags::NONE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CopyConfig {
    /// Reads a configuration such as `{ "flags": { "copy_chan": true }, "max_depth": 4 }`.
    /// Missing settings keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// A reusable deep copier.
///
/// ```
/// use replica::*;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut store = Store::new();
/// let src = store.alloc(Value::from("hello"))?;
/// let dst = store.alloc_zeroed(TypeId::STRING)?;
///
/// let mut copier = Copier::new();
/// copier.set_flags(Flags::COPY_CHAN).set_max_depth(8);
/// copier.deep_copy(&mut store, &dst, &src)?;
/// assert_eq!(store.load(&dst), Some(&Value::from("hello")));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Copier {
    config: CopyConfig,
}

impl Copier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: CopyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    pub fn get_flags(&self) -> Flags {
        self.config.flags
    }

    pub fn set_flags(&mut self, flags: Flags) -> &mut Self {
        self.config.flags = flags;
        self
    }

    pub fn get_max_depth(&self) -> usize {
        self.config.max_depth
    }

    pub fn set_max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Copies `src` into the cell that `dst` points to, using this copier's flags and depth
    /// limit. `dst` must be a non-nil pointer; any other destination is left untouched.
    pub fn deep_copy(&self, store: &mut Store, dst: &Value, src: &Value) -> Result<(), CopyError> {
        let (types, heap) = store.split_mut();
        CopyEngine::new(types, heap, self.config.flags, self.config.max_depth).run(dst, src)
    }
}

/// One-shot deep copy with the union of `flags` and no depth limit.
pub fn deep_copy(
    store: &mut Store,
    dst: &Value,
    src: &Value,
    flags: &[Flags],
) -> Result<(), CopyError> {
    Copier::from_config(CopyConfig {
        flags: Flags::combine(flags),
        max_depth: DEFAULT_MAX_DEPTH,
    })
    .deep_copy(store, dst, src)
}
