//! Error taxonomy for the seeding pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of the join / seed / refine pipeline.
///
/// Out-of-range or unparseable `K` and iteration values are not errors: they
/// are reported through [`crate::validate::ValidationFlags`] so that both
/// diagnostics can be shown together.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("expected 4 or 5 positional arguments (K [iter] eps file_1 file_2), got {found}")]
    ArgumentCount { found: usize },

    #[error("invalid convergence threshold: {0}")]
    InvalidEpsilon(String),

    #[error("malformed input in {}: {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: polars::prelude::PolarsError,
    },

    #[error("cannot choose {k} centers from {n} points")]
    InvalidClusterCount { k: usize, n: usize },

    #[error(
        "degenerate sampling distribution after {chosen} of {requested} centers: \
         every remaining point coincides with a chosen center"
    )]
    DegenerateDistribution { chosen: usize, requested: usize },

    #[error(
        "sampling weights overflow after {chosen} of {requested} centers: \
         coordinates are too far apart to weigh"
    )]
    WeightOverflow { chosen: usize, requested: usize },

    #[error("refinement failed: {0}")]
    Refinement(String),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SeedError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SeedError::MalformedInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
