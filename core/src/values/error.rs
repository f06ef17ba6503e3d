//! Errors raised while building runtime values by hand.

use thiserror::Error;

/// A value did not match the type it was declared with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("{ty} is not a sequence type")]
    NotASequenceType { ty: String },

    #[error("{ty} needs exactly {expected} elements, found {found}")]
    LengthMismatch {
        ty: String,
        expected: usize,
        found: usize,
    },

    #[error("element {index}: expected {expected}, found {found}")]
    ElementTypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("{ty} is not a mapping type")]
    NotAMappingType { ty: String },

    #[error("mapping key: expected {expected}, found {found}")]
    KeyTypeMismatch { expected: String, found: String },

    #[error("values of type {found} cannot be mapping keys")]
    UnhashableKey { found: String },

    #[error("{ty} is not a record type")]
    NotARecordType { ty: String },

    #[error("{record} has no field {field}")]
    UnknownField { record: String, field: String },

    #[error("{record} is missing field {field}")]
    MissingField { record: String, field: String },

    #[error("field {field}: expected {expected}, found {found}")]
    FieldTypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("{record} has no method {method}")]
    UnknownMethod { record: String, method: String },

    #[error("{record} is missing method {method}")]
    MissingMethod { record: String, method: String },

    #[error("method {method}: {found} does not implement {expected}")]
    MethodTypeMismatch {
        method: String,
        expected: String,
        found: String,
    },

    #[error("a reference to {target} cannot have type {ty}")]
    ReferenceTypeMismatch { ty: String, target: String },

    #[error("global {name}: expected {expected}, found {found}")]
    GlobalTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
}
