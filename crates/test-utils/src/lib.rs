//! Shared test utilities for the raster-mappers workspace.
//!
//! - Test data path helpers and skip macros for optional real files
//! - [`MemoryBackend`] and [`RawMetadataBuilder`] for mapper tests without I/O
//! - [`Grib2Builder`] for synthetic GRIB2 messages
//! - Zarr fixture writers for AROME-like, GOES-like and plain CF stores
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod grib2;
pub mod memory;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use grib2::*;
pub use memory::*;
pub use paths::*;

/// Skip a test when the named file cannot be found.
///
/// ```ignore
/// #[test]
/// fn test_real_arome_file() {
///     let path = require_test_file!("arome_arctic_sample.nc");
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Set MAPPER_TEST_DATA_DIR or TEST_DATA_DIR.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Approximate floating-point equality.
///
/// ```ignore
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise approximate equality of two slices; NaN matches NaN.
#[macro_export]
macro_rules! assert_allclose {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f64] = &$left;
        let right: &[f64] = &$right;
        assert_eq!(left.len(), right.len(), "length mismatch");
        for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
            if a.is_nan() && b.is_nan() {
                continue;
            }
            if (a - b).abs() > $epsilon {
                panic!(
                    "assertion failed at index {}: `{:?}` vs `{:?}` (epsilon `{:?}`)",
                    i, a, b, $epsilon
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_allclose_nan_matches_nan() {
        assert_allclose!(vec![1.0, f64::NAN], vec![1.0 + 1e-9, f64::NAN], 1e-6);
    }

    #[test]
    #[should_panic(expected = "index 1")]
    fn test_assert_allclose_fails() {
        assert_allclose!(vec![1.0, 2.0], vec![1.0, 2.5], 1e-6);
    }
}
