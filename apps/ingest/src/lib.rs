// Export our modules for use in binaries and tests
pub mod assemble;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod net;
pub mod pipeline;
pub mod presenter;
pub mod render;
pub mod sanitize;
pub mod source;
pub mod validate;

pub use domain::{Blip, CanonicalBlipRecord, Quadrant, Radar, RadarMetadata, Ring};
pub use error::{ClassifiedError, ErrorKind};
pub use pipeline::{LoadOutcome, Pipeline};
pub use source::{Locator, SourceKind};
