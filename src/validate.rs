//! Bounds checks for the requested cluster count and iteration cap

/// Iteration caps must lie strictly between 1 and this value.
pub const MAX_ITER_EXCLUSIVE: i64 = 1000;

pub const INVALID_CLUSTERS_MESSAGE: &str = "Invalid number of clusters!";
pub const INVALID_ITERATION_MESSAGE: &str = "Invalid maximum iteration!";

/// Outcome of checking `K` and the iteration cap against the joined data.
///
/// A `None` input (token that was not an integer) always yields a false flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationFlags {
    pub k_valid: bool,
    pub iter_valid: bool,
}

impl ValidationFlags {
    /// Both checks always run so both diagnostics can be reported together.
    pub fn check(k: Option<i64>, max_iter: Option<i64>, n_points: usize) -> Self {
        let k_valid = k.is_some_and(|k| 1 < k && i128::from(k) < n_points as i128);
        let iter_valid = max_iter.is_some_and(|iter| 1 < iter && iter < MAX_ITER_EXCLUSIVE);

        Self {
            k_valid,
            iter_valid,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.k_valid && self.iter_valid
    }

    /// User-facing messages for every failed check, clusters first
    pub fn diagnostics(&self) -> Vec<&'static str> {
        let mut messages = Vec::new();
        if !self.k_valid {
            messages.push(INVALID_CLUSTERS_MESSAGE);
        }
        if !self.iter_valid {
            messages.push(INVALID_ITERATION_MESSAGE);
        }
        messages
    }
}
