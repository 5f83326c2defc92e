//! Synthetic value grids with easily verifiable patterns.

/// Row-major grid where `value(col, row) = col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Temperature-like values in Kelvin, warmest in the middle rows.
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let lat_factor = 1.0 - (2.0 * row as f64 / height.max(1) as f64 - 1.0).abs();
        let temp = 250.0 + lat_factor * 60.0;
        data.extend(std::iter::repeat(temp).take(width));
    }
    data
}

/// Evenly spaced axis `start, start + step, ...` of length `n`.
pub fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_range() {
        let grid = create_temperature_grid(4, 10);
        assert!(grid.iter().all(|&t| (250.0..=310.0).contains(&t)));
    }

    #[test]
    fn test_axis() {
        assert_eq!(axis(1.0, 0.5, 3), vec![1.0, 1.5, 2.0]);
    }
}
