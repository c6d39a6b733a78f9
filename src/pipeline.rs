//! Two-phase run: join and validate, then seed, refine and format

use crate::cli::{Invocation, RefineMode};
use crate::data::load_and_join;
use crate::output::write_result;
use crate::refine::{LinfaRefiner, LloydRefiner, Refiner};
use crate::seeding::{seeded_rng, CentroidSet, DistanceWeighting, KMeansPlusPlus, RANDOM_SEED};
use crate::validate::ValidationFlags;
use ndarray::Array2;
use std::io::Write;
use tracing::info;

/// Knobs that are not part of the positional contract
pub struct PipelineOptions {
    pub weighting: DistanceWeighting,
    pub seed: u64,
    pub refiner: Option<Box<dyn Refiner>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            weighting: DistanceWeighting::default(),
            seed: RANDOM_SEED,
            refiner: None,
        }
    }
}

impl PipelineOptions {
    pub fn with_refine_mode(mut self, mode: RefineMode) -> Self {
        self.refiner = match mode {
            RefineMode::None => None,
            RefineMode::Lloyd => Some(Box::new(LloydRefiner)),
            RefineMode::Linfa => Some(Box::new(LinfaRefiner)),
        };
        self
    }
}

/// Everything a successful run computed
#[derive(Debug, Clone, PartialEq)]
pub struct SeedingReport {
    pub n_points: usize,
    pub seeded: CentroidSet,
    /// Centers returned by the refiner, if one ran
    pub refined: Option<Array2<f64>>,
}

impl SeedingReport {
    /// Centers that get printed: refined when available, seeded otherwise
    pub fn final_centroids(&self) -> &Array2<f64> {
        self.refined.as_ref().unwrap_or(&self.seeded.centroids)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// K or the iteration cap was rejected; diagnostics were written
    Rejected(ValidationFlags),
    Completed(SeedingReport),
}

/// Run the whole pipeline, writing diagnostics or the result to `out`
///
/// Nothing is written until every fallible step has succeeded, so a failed
/// run leaves no partial centroid output.
pub fn run_pipeline<W: Write>(
    invocation: &Invocation,
    options: &PipelineOptions,
    out: &mut W,
) -> crate::Result<Outcome> {
    let matrix = load_and_join(&invocation.file_1, &invocation.file_2)?;

    let flags = ValidationFlags::check(invocation.k, invocation.max_iter, matrix.n_points());
    if !flags.is_valid() {
        for message in flags.diagnostics() {
            writeln!(out, "{message}")?;
        }
        info!(?flags, n_points = matrix.n_points(), "arguments rejected");
        return Ok(Outcome::Rejected(flags));
    }

    // Both values were range-checked above, so the casts are lossless.
    let k = invocation.k.unwrap_or_default() as usize;
    let max_iter = invocation.max_iter.unwrap_or_default() as usize;

    let mut rng = seeded_rng(options.seed);
    let seeded = KMeansPlusPlus::new(k)
        .weighting(options.weighting)
        .seed(&matrix, &mut rng)?;
    info!(keys = ?seeded.keys, "seeding finished");

    let refined = match &options.refiner {
        Some(refiner) => Some(refiner.refine(
            &matrix.features,
            &seeded.centroids,
            max_iter,
            invocation.eps,
        )?),
        None => None,
    };

    let report = SeedingReport {
        n_points: matrix.n_points(),
        seeded,
        refined,
    };
    write_result(out, &report.seeded.keys, report.final_centroids())?;

    Ok(Outcome::Completed(report))
}
