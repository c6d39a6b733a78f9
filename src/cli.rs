//! Command-line interface definitions and argument parsing

use crate::error::SeedError;
use crate::seeding::{DistanceWeighting, RANDOM_SEED};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Iteration cap used when the optional `iter` token is omitted.
pub const DEFAULT_MAX_ITER: i64 = 300;

/// Seed initial k-means centers with k-means++ over two inner-joined data files
///
/// Positional arguments: K [iter] eps file_name_1 file_name_2
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, allow_negative_numbers = true)]
pub struct Args {
    /// K [iter] eps file_name_1 file_name_2
    #[arg(value_name = "ARGS")]
    pub positional: Vec<String>,

    /// Refinement engine to run on the seeded centers
    #[arg(long, value_enum, default_value_t = RefineMode::None)]
    pub refine: RefineMode,

    /// How nearest-center distances are turned into sampling weights
    #[arg(long, value_enum, default_value_t = DistanceWeighting::Linear)]
    pub weighting: DistanceWeighting,

    /// Seed for the random source
    #[arg(long, default_value_t = RANDOM_SEED)]
    pub seed: u64,

    /// Verbosity level (-v, -vv, -vvv), logged to stderr
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Which refinement engine, if any, consumes the seeded centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RefineMode {
    /// Print the seeded centers as-is
    None,
    /// Native Lloyd iterations
    Lloyd,
    /// linfa-clustering KMeans started from the seeded centers
    Linfa,
}

/// Positional arguments after count and type interpretation.
///
/// `k` and `max_iter` are `None` when the token is not an integer; the
/// validator reports that instead of aborting.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub k: Option<i64>,
    pub max_iter: Option<i64>,
    pub eps: f64,
    pub file_1: PathBuf,
    pub file_2: PathBuf,
}

impl Args {
    /// Interpret the raw positional tokens.
    /// Expected format: "K [iter] eps file_name_1 file_name_2"
    pub fn invocation(&self) -> crate::Result<Invocation> {
        Invocation::from_tokens(&self.positional)
    }
}

impl Invocation {
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> crate::Result<Self> {
        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();

        let (k, max_iter, eps, file_1, file_2) = match tokens.as_slice() {
            [k, eps, file_1, file_2] => (*k, None, *eps, *file_1, *file_2),
            [k, iter, eps, file_1, file_2] => (*k, Some(*iter), *eps, *file_1, *file_2),
            other => return Err(SeedError::ArgumentCount { found: other.len() }),
        };

        let eps: f64 = eps
            .trim()
            .parse()
            .map_err(|_| SeedError::InvalidEpsilon(eps.to_string()))?;
        if !eps.is_finite() {
            return Err(SeedError::InvalidEpsilon(eps.to_string()));
        }

        Ok(Invocation {
            k: parse_integer(k),
            max_iter: max_iter.map_or(Some(DEFAULT_MAX_ITER), parse_integer),
            eps,
            file_1: PathBuf::from(file_1),
            file_2: PathBuf::from(file_2),
        })
    }
}

fn parse_integer(token: &str) -> Option<i64> {
    token.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(positional: &[&str]) -> Args {
        Args {
            positional: positional.iter().map(|s| s.to_string()).collect(),
            refine: RefineMode::None,
            weighting: DistanceWeighting::Linear,
            seed: RANDOM_SEED,
            verbose: 0,
        }
    }

    #[test]
    fn test_four_tokens_use_default_iteration_cap() {
        let invocation = args(&["3", "0.001", "a.csv", "b.txt"]).invocation().unwrap();

        assert_eq!(invocation.k, Some(3));
        assert_eq!(invocation.max_iter, Some(DEFAULT_MAX_ITER));
        assert_eq!(invocation.eps, 0.001);
        assert_eq!(invocation.file_1, PathBuf::from("a.csv"));
        assert_eq!(invocation.file_2, PathBuf::from("b.txt"));
    }

    #[test]
    fn test_five_tokens_read_iteration_cap() {
        let invocation = args(&["3", "150", "0", "a.csv", "b.csv"]).invocation().unwrap();

        assert_eq!(invocation.k, Some(3));
        assert_eq!(invocation.max_iter, Some(150));
        assert_eq!(invocation.eps, 0.0);
    }

    #[test]
    fn test_non_integer_tokens_demote_instead_of_failing() {
        let invocation = args(&["three", "2.5", "0.1", "a.csv", "b.csv"])
            .invocation()
            .unwrap();

        assert_eq!(invocation.k, None);
        assert_eq!(invocation.max_iter, None);
    }

    #[test]
    fn test_wrong_token_count_is_fatal() {
        let cases: [&[&str]; 3] = [&["3", "a.csv", "b.csv"], &[], &["1", "2", "3", "4", "5", "6"]];
        for tokens in cases {
            let err = args(tokens).invocation().unwrap_err();
            assert!(matches!(err, SeedError::ArgumentCount { found } if found == tokens.len()));
        }
    }

    #[test]
    fn test_unparseable_epsilon_is_fatal() {
        let err = args(&["3", "small", "a.csv", "b.csv"]).invocation().unwrap_err();
        assert!(matches!(err, SeedError::InvalidEpsilon(_)));
    }

    #[test]
    fn test_negative_k_reaches_validator() {
        let parsed = Args::try_parse_from(["kmeanspp", "-2", "0.01", "a.csv", "b.csv"]).unwrap();
        let invocation = parsed.invocation().unwrap();

        assert_eq!(invocation.k, Some(-2));
        assert_eq!(parsed.refine, RefineMode::None);
        assert_eq!(parsed.seed, RANDOM_SEED);
    }

    #[test]
    fn test_flags_parse_alongside_positionals() {
        let parsed = Args::try_parse_from([
            "kmeanspp",
            "--refine",
            "lloyd",
            "--weighting",
            "squared",
            "-vv",
            "4",
            "0.01",
            "a.csv",
            "b.csv",
        ])
        .unwrap();

        assert_eq!(parsed.refine, RefineMode::Lloyd);
        assert_eq!(parsed.weighting, DistanceWeighting::Squared);
        assert_eq!(parsed.verbose, 2);
        assert_eq!(parsed.positional.len(), 4);
    }
}
