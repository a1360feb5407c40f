//! Entity spec intermediate representation and loader.
//!
//! A spec file is parsed once per run into an immutable [`Spec`]; renderers
//! only ever read it.

mod load;
mod types;

pub use load::*;
pub use types::*;
