//! Text rendering of the chosen keys and centroid coordinates

use ndarray::{Array2, ArrayView1};
use std::io::Write;

/// Comma-joined keys in selection order
pub fn format_keys(keys: &[i64]) -> String {
    keys.iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// One centroid, each coordinate with exactly four fractional digits
pub fn format_centroid(centroid: ArrayView1<f64>) -> String {
    centroid
        .iter()
        .map(|value| format!("{value:.4}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write the key line followed by one line per centroid
///
/// # Arguments
/// * `out` - Destination, stdout for the CLI
/// * `keys` - Original keys of the seeded centers
/// * `centroids` - Seeded or refined centers, one row per key
pub fn write_result<W: Write>(
    out: &mut W,
    keys: &[i64],
    centroids: &Array2<f64>,
) -> std::io::Result<()> {
    writeln!(out, "{}", format_keys(keys))?;
    for centroid in centroids.outer_iter() {
        writeln!(out, "{}", format_centroid(centroid))?;
    }
    out.flush()
}
