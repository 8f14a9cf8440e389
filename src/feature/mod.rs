//! Feature modules
//!
//! Features are discovered by file name, loaded lazily and at most once, and
//! classified by what their module table exports.

pub mod loader;
pub mod record;

pub use loader::{is_valid_feature_name, FeatureLoader};
pub use record::{FeatureRecord, FeatureShape, FeatureState, Features};
