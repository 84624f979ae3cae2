//! Numeric casts and small array helpers shared by the propagation code.
#[must_use]
pub const fn usize_to_f64(value: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let newval = value as f64;
    newval
}

#[must_use]
pub const fn f64_to_usize(value: f64) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let newval = value as usize;
    newval
}

/// Return `num` evenly spaced values over the closed interval `[start, stop]`.
///
/// A single requested value yields `start`, zero values yield an empty vector.
#[must_use]
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / usize_to_f64(num - 1);
            let mut values: Vec<f64> = (0..num)
                .map(|i| usize_to_f64(i).mul_add(step, start))
                .collect();
            values[num - 1] = stop;
            values
        }
    }
}

/// Mean spacing of consecutive values (`mean(diff(values))`).
///
/// Returns `None` for fewer than two values.
#[must_use]
pub fn mean_step(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some((values[values.len() - 1] - values[0]) / usize_to_f64(values.len() - 1))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    #[test]
    fn casts() {
        assert_eq!(usize_to_f64(3), 3.0);
        assert_eq!(f64_to_usize(3.7), 3);
        assert_eq!(f64_to_usize(-1.0), 0);
    }
    #[test]
    fn linspace_bounds() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        let v = linspace(-1.0, 1.0, 5);
        assert_eq!(v.len(), 5);
        assert_abs_diff_eq!(v[0], -1.0);
        assert_abs_diff_eq!(v[2], 0.0);
        assert_eq!(v[4], 1.0);
    }
    #[test]
    fn mean_step_values() {
        assert!(mean_step(&[1.0]).is_none());
        assert_abs_diff_eq!(mean_step(&[0.0, 0.5, 1.0, 1.5]).unwrap(), 0.5);
    }
}
