//! Holistic (whole-image) feature functions.
//!
//! A [`HolisticFeature`] is a shared function value. Two features are "the
//! same" when they share the same allocation ([`HolisticFeature::ptr_eq`]),
//! which is what lets the pyramid builder skip recomputing a feature image
//! when consecutive scales use the same feature. The stock features below
//! hand out clones of a single shared instance, so every call to e.g.
//! [`no_op`] compares equal to every other.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::image::Image;

type FeatureFn = dyn Fn(&Image) -> Result<Image> + Send + Sync;

#[derive(Clone)]
pub struct HolisticFeature {
    name: Arc<str>,
    func: Arc<FeatureFn>,
}

impl HolisticFeature {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Image) -> Result<Image> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compute(&self, image: &Image) -> Result<Image> {
        (self.func)(image)
    }

    /// Identity comparison: true when both handles point at the same function.
    pub fn ptr_eq(&self, other: &HolisticFeature) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for HolisticFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HolisticFeature").field(&self.name).finish()
    }
}

/// Look up a stock feature by name (`no_op`, `gradient`, `normalize_std`).
pub fn by_name(name: &str) -> Option<HolisticFeature> {
    match name {
        "no_op" => Some(no_op()),
        "gradient" => Some(gradient()),
        "normalize_std" => Some(normalize_std()),
        _ => None,
    }
}

/// Returns the input unchanged.
pub fn no_op() -> HolisticFeature {
    static FEATURE: OnceLock<HolisticFeature> = OnceLock::new();
    FEATURE
        .get_or_init(|| HolisticFeature::new("no_op", |image| Ok(image.clone())))
        .clone()
}

/// Central-difference image gradient. Each input channel `c` produces two
/// output channels: `2c` (d/dx) and `2c + 1` (d/dy).
pub fn gradient() -> HolisticFeature {
    static FEATURE: OnceLock<HolisticFeature> = OnceLock::new();
    FEATURE
        .get_or_init(|| HolisticFeature::new("gradient", compute_gradient))
        .clone()
}

/// Per-channel zero mean, unit standard deviation.
pub fn normalize_std() -> HolisticFeature {
    static FEATURE: OnceLock<HolisticFeature> = OnceLock::new();
    FEATURE
        .get_or_init(|| HolisticFeature::new("normalize_std", compute_normalize_std))
        .clone()
}

fn compute_gradient(image: &Image) -> Result<Image> {
    let (w, h, nc) = (image.width(), image.height(), image.n_channels());
    let mut out = vec![0.0f32; w * h * nc * 2];
    for y in 0..h {
        for x in 0..w {
            // One-sided differences at the border
            let (xl, xr) = (x.saturating_sub(1), (x + 1).min(w - 1));
            let (yu, yd) = (y.saturating_sub(1), (y + 1).min(h - 1));
            let dx_span = (xr - xl).max(1) as f32;
            let dy_span = (yd - yu).max(1) as f32;
            for c in 0..nc {
                let gx = (image.get(xr as i64, y as i64, c) - image.get(xl as i64, y as i64, c))
                    / dx_span;
                let gy = (image.get(x as i64, yd as i64, c) - image.get(x as i64, yu as i64, c))
                    / dy_span;
                let base = (y * w + x) * nc * 2 + c * 2;
                out[base] = gx;
                out[base + 1] = gy;
            }
        }
    }
    image.with_pixels(nc * 2, out)
}

fn compute_normalize_std(image: &Image) -> Result<Image> {
    let nc = image.n_channels();
    let n = (image.width() * image.height()) as f64;
    let mut out = image.pixels().to_vec();
    for c in 0..nc {
        let values = || image.pixels().iter().skip(c).step_by(nc).map(|&v| v as f64);
        let mean = values().sum::<f64>() / n;
        let var = values().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = var.sqrt();
        let scale = if std > f64::EPSILON { 1.0 / std } else { 1.0 };
        for v in out.iter_mut().skip(c).step_by(nc) {
            *v = ((*v as f64 - mean) * scale) as f32;
        }
    }
    image.with_pixels(nc, out)
}
