//! Small numeric helpers shared by the forecaster and the calibration engine

/// Pivots smaller than this are treated as singular
const SINGULAR_EPSILON: f64 = 1e-12;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Number of distinct values, compared exactly
pub fn distinct_count(values: &[f64]) -> usize {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.dedup();
    sorted.len()
}

/// Solve `a * x = b` for a square system by Gaussian elimination with
/// partial pivoting. Returns `None` when the system is singular.
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < SINGULAR_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        let pivot_b = b[col];
        for row in (col + 1)..n {
            let factor = a[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * pivot_row[k];
            }
            b[row] -= factor * pivot_b;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Ordinary least squares for `y = X * beta`, via the normal equations
pub fn least_squares(design: &[Vec<f64>], targets: &[f64]) -> Option<Vec<f64>> {
    let k = design.first()?.len();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, y) in design.iter().zip(targets) {
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    solve_linear_system(xtx, xty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 5.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_distinct_count() {
        assert_eq!(distinct_count(&[1.0, 1.0, 2.0, 3.0, 3.0]), 3);
        assert_eq!(distinct_count(&[1.0, 1.0]), 1);
    }

    #[test]
    fn test_solve_linear_system() {
        // 2x + y = 5, x - y = 1 -> x = 2, y = 1
        let a = vec![vec![2.0, 1.0], vec![1.0, -1.0]];
        let x = solve_linear_system(a, vec![5.0, 1.0]).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_system() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve_linear_system(a, vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_least_squares_line() {
        let design: Vec<Vec<f64>> = (0..5).map(|i| vec![1.0, i as f64]).collect();
        let targets: Vec<f64> = (0..5).map(|i| 3.0 + 2.0 * i as f64).collect();
        let beta = least_squares(&design, &targets).unwrap();
        assert!((beta[0] - 3.0).abs() < 1e-9);
        assert!((beta[1] - 2.0).abs() < 1e-9);
    }
}
