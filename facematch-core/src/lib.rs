pub mod embedding;
pub mod error;
pub mod gallery;
pub mod matcher;
pub mod metric;
pub mod model;

// Re-export commonly used types
pub use error::{MatchError, Result};
pub use gallery::Gallery;
pub use matcher::{IdentityMatcher, Label, MatcherConfig, SubjectScore, UNKNOWN_LABEL};
pub use metric::Metric;
pub use model::{ModelInfo, ModelKind};
