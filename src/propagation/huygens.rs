//! 1-D Huygens-Fresnel diffraction integral.
//!
//! The field at every output point is the coherent superposition of cylindrical wavelets emitted by all input
//! samples:
//!
//! `E_out[j] = Σ_i E_in[i] · w_i · exp(-i·k·r_ij) / sqrt(i·λ·r_ij)`
//!
//! with `k = 2π/λ`, `r_ij` the distance between input sample `i` and output point `j` and `w_i` the trapezoidal
//! arc length weight of input sample `i` along the input polyline.
use crate::{
    error::{WiseError, WiseResult},
    mirror::arc_length,
};
use num::{complex::Complex64, Zero};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use std::{
    collections::HashMap,
    f64::consts::{FRAC_PI_4, PI},
    sync::{Arc, Mutex, OnceLock},
};

/// Trapezoidal integration weights of the samples of a polyline.
///
/// A single sample gets the weight 1.0.
#[must_use]
pub fn integration_weights(x: &[f64], y: &[f64]) -> Vec<f64> {
    let s = arc_length(x, y);
    let n = s.len();
    if n < 2 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| {
            let left = if i == 0 { s[0] } else { s[i - 1] };
            let right = if i == n - 1 { s[n - 1] } else { s[i + 1] };
            0.5 * (right - left)
        })
        .collect()
}

/// Returns the thread pool with `workers` threads.
///
/// Pools are built on first use and shared by all following integrals with the same number of workers.
fn worker_pool(workers: usize) -> WiseResult<Arc<ThreadPool>> {
    static POOLS: OnceLock<Mutex<HashMap<usize, Arc<ThreadPool>>>> = OnceLock::new();
    let mut pools = POOLS
        .get_or_init(Mutex::default)
        .lock()
        .map_err(|_| WiseError::Other("worker pool cache is poisoned".into()))?;
    if let Some(pool) = pools.get(&workers) {
        return Ok(Arc::clone(pool));
    }
    let pool = Arc::new(
        ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| WiseError::Other(format!("cannot create worker pool: {e}")))?,
    );
    pools.insert(workers, Arc::clone(&pool));
    Ok(pool)
}

struct Emitters<'a> {
    wave_number: f64,
    wavelength: f64,
    field: Vec<Complex64>,
    x: &'a [f64],
    y: &'a [f64],
}
impl Emitters<'_> {
    fn field_at(&self, x: f64, y: f64) -> WiseResult<Complex64> {
        let mut sum = Complex64::zero();
        for ((e, xi), yi) in self.field.iter().zip(self.x).zip(self.y) {
            let r = (x - xi).hypot(y - yi);
            if r == 0.0 || !r.is_finite() {
                return Err(WiseError::Configuration(
                    "coincident or non-finite points in the diffraction integral".into(),
                ));
            }
            sum += e * Complex64::from_polar(
                1.0 / (self.wavelength * r).sqrt(),
                -self.wave_number.mul_add(r, FRAC_PI_4),
            );
        }
        if sum.is_finite() {
            Ok(sum)
        } else {
            Err(WiseError::integration_instability())
        }
    }
    fn field_on(&self, x: &[f64], y: &[f64]) -> WiseResult<Vec<Complex64>> {
        x.iter()
            .zip(y)
            .map(|(x, y)| self.field_at(*x, *y))
            .collect()
    }
}

/// Propagate a sampled field from the input points to the output points.
///
/// With `workers > 1`, the output points are split in contiguous chunks evaluated on a pool of `workers`
/// threads. The pool is reused by later calls with the same number of workers. The output order always corresponds to the order of `x_out`/`y_out` and the result does not
/// depend on the number of workers. A failure in any chunk fails the whole call.
///
/// # Errors
///
/// This function will return an error if
///   - the wavelength is not positive and finite.
///   - the input arrays are empty or have different lengths or the output arrays have different lengths.
///   - an input and an output point coincide or a coordinate is not finite.
///   - the integral is not finite ([`WiseError::IntegrationInstability`]).
///   - the worker pool cannot be created.
pub fn huygens_integral(
    wavelength: f64,
    field_in: &[Complex64],
    x_in: &[f64],
    y_in: &[f64],
    x_out: &[f64],
    y_out: &[f64],
    workers: usize,
) -> WiseResult<Vec<Complex64>> {
    if !wavelength.is_normal() || wavelength.is_sign_negative() {
        return Err(WiseError::Configuration(
            "wavelength must be > 0.0 and finite".into(),
        ));
    }
    if field_in.is_empty() || field_in.len() != x_in.len() || x_in.len() != y_in.len() {
        return Err(WiseError::Configuration(
            "input field and input coordinates must be non-empty and of equal length".into(),
        ));
    }
    if x_out.len() != y_out.len() {
        return Err(WiseError::Configuration(
            "output coordinates must have equal length".into(),
        ));
    }
    let emitters = Emitters {
        wave_number: 2.0 * PI / wavelength,
        wavelength,
        field: field_in
            .iter()
            .zip(integration_weights(x_in, y_in))
            .map(|(e, w)| e * w)
            .collect(),
        x: x_in,
        y: y_in,
    };
    if workers <= 1 || x_out.len() < 2 {
        return emitters.field_on(x_out, y_out);
    }
    let pool = worker_pool(workers)?;
    let chunk = x_out.len().div_ceil(workers);
    let chunks = pool.install(|| {
        x_out
            .par_chunks(chunk)
            .zip(y_out.par_chunks(chunk))
            .map(|(x, y)| emitters.field_on(x, y))
            .collect::<WiseResult<Vec<_>>>()
    })?;
    Ok(chunks.into_iter().flatten().collect())
}
