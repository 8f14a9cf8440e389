//! Host-side services
//!
//! - [`fs`]: filesystem checks and listing
//! - [`shell`]: blocking shell command execution
//! - [`api`]: the `host` table handed to feature modules

pub mod api;
pub mod fs;
pub mod shell;
