//! Language-agnostic declaration model reconstructed from DWARF debug info:
//! classes, structs, unions, namespaces, typedefs and enumerations, with
//! their members and fully-qualified types.

mod accessibility;
pub use accessibility::*;
mod str;
pub use str::*;
mod file;
pub use file::*;
mod ty;
pub use ty::*;
mod member;
pub use member::*;
mod decl;
pub use decl::*;
