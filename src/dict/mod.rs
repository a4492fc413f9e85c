//! User-facing dictionary assembly.
//!
//! The assembler turns a user id into a DICT: it enumerates the user's
//! datasets, requests each from the coordinator, merges the per-dataset
//! token maps, and overlays the fixed system vocabulary of operators.

mod assembler;
mod system;

pub use assembler::{DictError, DictionaryAssembler};
pub use system::system_dictionary;
