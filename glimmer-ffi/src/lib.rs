// glimmer-ffi: #[repr(C)] types, handle types, API table definition.
// Zero external dependencies. This crate defines the complete Rust ↔ native
// runtime contract.

pub mod handles;
pub mod error;
pub mod value;
pub mod api_table;
pub mod abi;

pub use handles::*;
pub use error::*;
pub use value::*;
pub use api_table::*;
