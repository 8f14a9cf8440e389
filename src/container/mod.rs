//! Protected containers and layered views
//!
//! - [`ProtectedTable`]: sealed at construction, rejects every write
//! - [`Overlay`]: mutable own entries over a read-only backing chain

mod overlay;
mod protected;

pub use overlay::Overlay;
pub use protected::{dump, Key, Protocol, ProtectedTable};
