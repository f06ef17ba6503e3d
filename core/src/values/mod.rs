pub mod dynamic;
pub mod error;
pub mod function;

pub use dynamic::{
    HostError, MapKey, Mapping, Record, RecordBuilder, Reference, Sequence, Value, host_error,
};
pub use error::ValueError;
pub use function::{BoundMethod, Function, FunctionRef, NativeFunction};
