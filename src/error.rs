// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::heap::Handle;
use crate::types::{Kind, TypeError, TypeTable};
use crate::value::Value;

use thiserror::Error;

/// Errors that abort a copy. Destination sub-values written before the error are kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    /// The destination (or source) slot has no defined copy behavior, e.g. its data does not
    /// match its declared type.
    #[error("unsupported kind '{kind}' for value of type '{ty}'")]
    UnsupportedKind { kind: Kind, ty: String },
    /// A pointer refers to a cell that does not exist.
    #[error("pointer to unallocated cell {}", .0.index())]
    DanglingPointer(Handle),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl CopyError {
    pub(crate) fn unsupported(types: &TypeTable, value: &Value) -> Self {
        CopyError::UnsupportedKind {
            kind: types.kind(value.ty()),
            ty: types.name(value.ty()),
        }
    }
}
