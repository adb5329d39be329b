pub mod config;
pub mod gallery_file;

// Re-export matcher types for convenience
pub use facematch_core::{
    embedding, Gallery, IdentityMatcher, Label, MatchError, MatcherConfig, Metric, ModelInfo,
    ModelKind, SubjectScore,
};

// C ABI for cdylib
pub mod ffi;
