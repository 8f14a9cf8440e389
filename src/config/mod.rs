//! Sandboxed configuration loading

pub mod evaluator;
pub mod result;

pub use evaluator::{ConfigEvaluator, ReloadOutcome};
pub use result::{ConfigurationResult, Published};
