//! Configuration sandboxing
//!
//! Configuration files are untrusted: they run against an allow-listed set of
//! pure capabilities and can reach nothing else of the host.

pub mod capabilities;
pub mod sandbox;

pub use capabilities::build_allow_list;
pub use sandbox::{SandboxBuilder, SandboxContext};
