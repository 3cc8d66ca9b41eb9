use ndarray::{Array1, ArrayView1};

fn finite_stats(column: &ArrayView1<'_, f64>) -> Option<(f64, f64, f64)> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &value in column.iter().filter(|value| !value.is_nan()) {
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }
    (count > 0).then(|| (sum / count as f64, min, max))
}

/// Rank-based quantile of every value inside its own column.
///
/// Missing values are ranked below the smallest present one. Ties get the
/// midpoint of their rank range, so a constant column maps to `0.5`. A column
/// with no values at all stays missing.
///
/// # Example
/// ```
/// use ndarray::array;
/// use dedoc_core::features::normalize::quantile;
/// let q = quantile(array![10.0, 20.0, 20.0, f64::NAN].view());
/// assert_eq!(q.to_vec(), vec![0.375, 0.75, 0.75, 0.125]);
/// ```
pub fn quantile(column: ArrayView1<'_, f64>) -> Array1<f64> {
    let Some((_, min, _)) = finite_stats(&column) else {
        return column.to_owned();
    };

    let filled = column.mapv(|value| if value.is_nan() { min - 1.0 } else { value });
    let mut sorted = filled.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    filled.mapv(|value| {
        let left = sorted.partition_point(|&x| x < value);
        let right = sorted.partition_point(|&x| x <= value);
        (left + right) as f64 / 2.0 / n
    })
}

/// `(x - mean) / (max - min)`, or all zeros for a constant column.
///
/// # Example
/// ```
/// use ndarray::array;
/// use dedoc_core::features::normalize::normalize;
/// assert_eq!(normalize(array![0.0, 5.0, 10.0].view()).to_vec(), vec![-0.5, 0.0, 0.5]);
/// assert_eq!(normalize(array![3.0, 3.0].view()).to_vec(), vec![0.0, 0.0]);
/// ```
pub fn normalize(column: ArrayView1<'_, f64>) -> Array1<f64> {
    match finite_stats(&column) {
        Some((mean, min, max)) if max - min != 0.0 => column.mapv(|value| (value - mean) / (max - min)),
        _ => Array1::zeros(column.len()),
    }
}

/// `x / (max - min + 1)`; missing values stay missing.
pub fn range_scale(column: ArrayView1<'_, f64>) -> Array1<f64> {
    match finite_stats(&column) {
        Some((_, min, max)) => column.mapv(|value| value / (max - min + 1.0)),
        None => column.to_owned(),
    }
}

/// `(value - min) / (max - min)`, or 0 when the range is empty.
pub fn min_max(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.0
    } else {
        (value - min) / (max - min)
    }
}
