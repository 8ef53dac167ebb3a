//! Parameter normalisation shared by the fitters and the configuration layer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Iteration budget: one value for every scale, or one per scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxIters {
    Uniform(usize),
    PerScale(Vec<usize>),
}

impl Default for MaxIters {
    fn default() -> Self {
        MaxIters::Uniform(20)
    }
}

impl From<usize> for MaxIters {
    fn from(n: usize) -> Self {
        MaxIters::Uniform(n)
    }
}

impl From<Vec<usize>> for MaxIters {
    fn from(v: Vec<usize>) -> Self {
        MaxIters::PerScale(v)
    }
}

impl From<&[usize]> for MaxIters {
    fn from(v: &[usize]) -> Self {
        MaxIters::PerScale(v.to_vec())
    }
}

/// Expand `max_iters` to exactly `n_scales` entries.
pub fn check_max_iters(max_iters: &MaxIters, n_scales: usize) -> Result<Vec<usize>> {
    match max_iters {
        MaxIters::Uniform(n) => Ok(vec![*n; n_scales]),
        MaxIters::PerScale(v) if v.len() == n_scales => Ok(v.clone()),
        MaxIters::PerScale(v) => Err(Error::ConfigurationMismatch {
            what: "max_iters entries (one per scale)",
            expected: n_scales,
            actual: v.len(),
        }),
    }
}

/// `None` disables cropping; any finite non-negative proportion (0 included)
/// is accepted.
pub fn check_crop_proportion(crop: Option<f64>) -> Result<Option<f64>> {
    match crop {
        Some(p) if !p.is_finite() || p < 0.0 => Err(Error::InvalidArgument(format!(
            "crop_image must be a non-negative proportion, got {}",
            p
        ))),
        other => Ok(other),
    }
}

/// Scale factors must be finite and positive.
pub fn check_scales(scales: &[f64]) -> Result<()> {
    if scales.is_empty() {
        return Err(Error::InvalidModel("at least one scale is required".into()));
    }
    if let Some(bad) = scales.iter().find(|s| !s.is_finite() || **s <= 0.0) {
        return Err(Error::InvalidModel(format!(
            "scale factors must be positive, got {}",
            bad
        )));
    }
    Ok(())
}
