//! kmeanspp: k-means++ seeding over two inner-joined tabular sources
//!
//! This library joins two headerless CSV sources on their integer key column,
//! validates the requested cluster count and iteration cap against the joined
//! row count, picks initial centers with k-means++ and optionally hands them
//! to a refinement engine before formatting the result.

pub mod cli;
pub mod data;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod refine;
pub mod seeding;
pub mod validate;

// Re-export public items for easier access
pub use cli::{Args, Invocation, RefineMode};
pub use data::{load_and_join, FeatureMatrix};
pub use error::SeedError;
pub use output::write_result;
pub use pipeline::{run_pipeline, Outcome, PipelineOptions, SeedingReport};
pub use refine::{LinfaRefiner, LloydRefiner, Refiner};
pub use seeding::{seeded_rng, CentroidSet, DistanceWeighting, KMeansPlusPlus};
pub use validate::ValidationFlags;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, SeedError>;
