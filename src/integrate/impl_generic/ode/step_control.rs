//! Step size control for adaptive ODE methods.
//!
//! States may consist of several tensors (the augmented adjoint system), so the
//! norms here run over every element of every component.

use numr::error::Result;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::common::to_host;
use crate::integrate::traits::OdeState;

/// Step size controller for adaptive methods.
#[derive(Debug, Clone)]
pub struct StepSizeController {
    /// Safety factor (default: 0.9)
    pub safety: f64,
    /// Minimum scale factor (default: 0.2)
    pub min_factor: f64,
    /// Maximum scale factor (default: 10.0)
    pub max_factor: f64,
}

impl Default for StepSizeController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
        }
    }
}

impl StepSizeController {
    /// Compute the new step size based on error estimate.
    ///
    /// # Arguments
    /// * `h` - Current step size
    /// * `err` - Normalized error (should be <= 1 for step acceptance)
    /// * `order` - Order of the error estimator
    pub fn compute_step(&self, h: f64, err: f64, order: usize) -> (f64, bool) {
        let accept = err <= 1.0;

        let exponent = 1.0 / (order as f64 + 1.0);
        let factor = if err == 0.0 {
            self.max_factor
        } else {
            self.safety * (1.0 / err).powf(exponent)
        };

        let factor = factor.clamp(self.min_factor, self.max_factor);

        // Don't increase step size after rejection
        let factor = if accept { factor } else { factor.min(1.0) };

        (h * factor, accept)
    }
}

/// Sum of all elements of `x`, as a host scalar.
pub(crate) fn sum_all_host<R, C>(client: &C, x: &Tensor<R>) -> Result<f64>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
{
    let dims: Vec<usize> = (0..x.shape().len()).collect();
    let total = client.sum(x, &dims, false)?;
    Ok(to_host(&total, "sum_all_host")?.iter().sum())
}

/// sqrt(mean((xᵢ / scᵢ)²)) over every element of every component.
pub fn scaled_rms_norm<R, C>(client: &C, xs: &[Tensor<R>], scales: &[Tensor<R>]) -> Result<f64>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
{
    debug_assert_eq!(xs.len(), scales.len());

    let mut sum_sq = 0.0;
    let mut n = 0usize;
    for (x, sc) in xs.iter().zip(scales) {
        let scaled = client.div(x, sc)?;
        let sq = client.mul(&scaled, &scaled)?;
        sum_sq += sum_all_host(client, &sq)?;
        n += x.numel();
    }

    if n == 0 {
        return Ok(0.0);
    }
    Ok((sum_sq / n as f64).sqrt())
}

/// Compute normalized error sqrt(mean((y_err / sc)²)) with
/// sc = atol + rtol * max(|y_old|, |y_new|).
pub fn compute_error<R, C>(
    client: &C,
    y_old: &[&Tensor<R>],
    y_new: &[&Tensor<R>],
    y_err: &[Tensor<R>],
    rtol: f64,
    atol: f64,
) -> Result<f64>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
{
    let scales = y_old
        .iter()
        .zip(y_new)
        .map(|(old, new)| {
            let y_max = client.maximum(&client.abs(old)?, &client.abs(new)?)?;
            client.add_scalar(&client.mul_scalar(&y_max, rtol)?, atol)
        })
        .collect::<Result<Vec<_>>>()?;

    scaled_rms_norm(client, y_err, &scales)
}

/// Compute initial step size using the algorithm from Hairer & Wanner.
///
/// `direction` is +1 for forward and -1 for backward integration; the returned
/// step is a magnitude.
#[allow(clippy::too_many_arguments)]
pub fn compute_initial_step<R, C, S, F>(
    client: &C,
    f: &F,
    t0: f64,
    y0: &S,
    f0: &S,
    direction: f64,
    order: usize,
    rtol: f64,
    atol: f64,
) -> Result<f64>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    S: OdeState<R, C>,
    F: Fn(f64, &S) -> Result<S>,
{
    let y0_parts = y0.components();
    let f0_parts = f0.components();

    // sc = atol + rtol * |y0|
    let scales = y0_parts
        .iter()
        .map(|y| client.add_scalar(&client.mul_scalar(&client.abs(y)?, rtol)?, atol))
        .collect::<Result<Vec<_>>>()?;

    let owned = |parts: &[&Tensor<R>]| parts.iter().map(|&p| p.clone()).collect::<Vec<_>>();

    let d0 = scaled_rms_norm(client, &owned(&y0_parts), &scales)?;
    let d1 = scaled_rms_norm(client, &owned(&f0_parts), &scales)?;

    // First guess
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };

    // Explicit Euler step to estimate second derivative
    let y1 = y0.axpy(&[(direction * h0, f0)], client)?;
    let f1 = f(t0 + direction * h0, &y1)?;

    // d2 = ||f1 - f0|| / h0
    let df = f1
        .components()
        .iter()
        .zip(&f0_parts)
        .map(|(a, b)| client.sub(a, b))
        .collect::<Result<Vec<_>>>()?;
    let d2 = scaled_rms_norm(client, &df, &scales)? / h0;

    let h1 = if d1.max(d2) <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / (order as f64 + 1.0))
    };

    Ok((100.0 * h0).min(h1))
}
