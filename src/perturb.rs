//! Randomized perturbation of alignments, used to synthesise fitting
//! initialisations for training and evaluation.
//!
//! All functions draw from a caller-supplied [`rand::Rng`]. Pass
//! `rand::thread_rng()` for ad-hoc use or a seeded `StdRng` for
//! reproducible perturbation sets.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::align::align_similarity;
use crate::error::{Error, Result};
use crate::transform::AffineTransform;
use crate::types::{Point, Shape};

/// Distribution of the perturbation of each similarity parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseType {
    #[default]
    Uniform,
    Gaussian,
}

impl FromStr for NoiseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(NoiseType::Uniform),
            "gaussian" => Ok(NoiseType::Gaussian),
            other => Err(Error::InvalidArgument(format!(
                "unexpected noise type '{}'. Supported values are {{gaussian, uniform}}",
                other
            ))),
        }
    }
}

impl fmt::Display for NoiseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseType::Uniform => f.write_str("uniform"),
            NoiseType::Gaussian => f.write_str("gaussian"),
        }
    }
}

/// Noise magnitude for the scale, rotation and translation components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NoisePercentageRepr")]
pub struct NoisePercentage([f64; 3]);

#[derive(Deserialize)]
#[serde(untagged)]
enum NoisePercentageRepr {
    Scalar(f64),
    List(Vec<f64>),
}

impl TryFrom<NoisePercentageRepr> for NoisePercentage {
    type Error = Error;

    fn try_from(repr: NoisePercentageRepr) -> Result<Self> {
        match repr {
            NoisePercentageRepr::Scalar(v) => Ok(v.into()),
            NoisePercentageRepr::List(v) => NoisePercentage::from_slice(&v),
        }
    }
}

impl NoisePercentage {
    pub const fn new(scale: f64, rotation: f64, translation: f64) -> Self {
        Self([scale, rotation, translation])
    }

    /// A single value is broadcast to all three components; three values are
    /// taken as `[scale, rotation, translation]`.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match *values {
            [v] => Ok(Self([v; 3])),
            [s, r, t] => Ok(Self([s, r, t])),
            _ => Err(Error::InvalidArgument(format!(
                "noise_percentage must have 1 or 3 elements, got {}",
                values.len()
            ))),
        }
    }

    pub fn scale(&self) -> f64 {
        self.0[0]
    }

    pub fn rotation(&self) -> f64 {
        self.0[1]
    }

    pub fn translation(&self) -> f64 {
        self.0[2]
    }
}

impl From<f64> for NoisePercentage {
    fn from(v: f64) -> Self {
        Self([v; 3])
    }
}

impl From<[f64; 3]> for NoisePercentage {
    fn from(v: [f64; 3]) -> Self {
        Self(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbOptions {
    pub noise_type: NoiseType,
    pub noise_percentage: NoisePercentage,
    /// Estimate the base alignment with rotation.
    pub rotation: bool,
}

impl Default for PerturbOptions {
    fn default() -> Self {
        Self {
            noise_type: NoiseType::Uniform,
            noise_percentage: NoisePercentage::from(0.05),
            rotation: false,
        }
    }
}

impl PerturbOptions {
    pub fn new(noise_type: NoiseType, noise_percentage: impl Into<NoisePercentage>) -> Self {
        Self {
            noise_type,
            noise_percentage: noise_percentage.into(),
            rotation: false,
        }
    }

    pub fn with_rotation(mut self, rotation: bool) -> Self {
        self.rotation = rotation;
        self
    }
}

fn draw<R: Rng + ?Sized>(noise_type: NoiseType, rng: &mut R) -> f64 {
    match noise_type {
        NoiseType::Gaussian => rng.sample(StandardNormal),
        NoiseType::Uniform => rng.gen_range(-1.0..=1.0),
    }
}

/// The optimal similarity alignment of `source` onto `target` with its scale,
/// rotation and translation independently perturbed.
///
/// Gaussian noise uses standard deviations of `pct·0.5/3` (relative scale),
/// `pct·180/3` degrees and `pct·range` per axis; uniform noise draws from
/// `±pct·0.5`, `±pct·180°` and `±pct·range`. Rotation and scale pivot about
/// the target's centroid. The result is
/// `alignment ∘ translation ∘ scale ∘ rotation`.
pub fn noisy_alignment_similarity_transform<R: Rng + ?Sized>(
    source: &Shape,
    target: &Shape,
    options: &PerturbOptions,
    rng: &mut R,
) -> Result<AffineTransform> {
    let similarity = align_similarity(source, target, options.rotation)?;
    let pct = options.noise_percentage;

    let (scale_spread, rotation_spread) = match options.noise_type {
        NoiseType::Gaussian => (0.5 / 3.0, 180.0 / 3.0),
        NoiseType::Uniform => (0.5, 180.0),
    };

    let s = pct.scale() * scale_spread * draw(options.noise_type, rng);
    let r = pct.rotation() * rotation_spread * draw(options.noise_type, rng);
    let range = target.range();
    let t = Point::new(
        pct.translation() * range.x * draw(options.noise_type, rng),
        pct.translation() * range.y * draw(options.noise_type, rng),
    );

    let scale = AffineTransform::scale_about_centre(target, 1.0 + s);
    let rotation = AffineTransform::rotate_ccw_about_centre(target, r);
    let translation = AffineTransform::translation(t);

    Ok(similarity.compose_after(&translation.compose_after(&scale.compose_after(&rotation))))
}

/// Per-point standard deviation of the white noise added to a target shape,
/// as a fraction of the target's per-axis range.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseStd {
    Uniform(f64),
    PerPoint(Vec<f64>),
}

impl From<f64> for NoiseStd {
    fn from(v: f64) -> Self {
        NoiseStd::Uniform(v)
    }
}

impl From<Vec<f64>> for NoiseStd {
    fn from(v: Vec<f64>) -> Self {
        NoiseStd::PerPoint(v)
    }
}

/// The alignment between `source` and a copy of `target` whose points were
/// jittered by Gaussian noise of standard deviation `noise_std · target.range()`.
pub fn noisy_target_alignment_transform<F, R>(
    source: &Shape,
    target: &Shape,
    alignment: F,
    noise_std: &NoiseStd,
    rng: &mut R,
) -> Result<AffineTransform>
where
    F: Fn(&Shape, &Shape) -> Result<AffineTransform>,
    R: Rng + ?Sized,
{
    if let NoiseStd::PerPoint(stds) = noise_std {
        if stds.len() != target.n_points() {
            return Err(Error::InvalidArgument(format!(
                "noise_std must define one value per point: expected {}, got {}",
                target.n_points(),
                stds.len()
            )));
        }
    }

    let range = target.range();
    let points = target
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let std = match noise_std {
                NoiseStd::Uniform(v) => *v,
                NoiseStd::PerPoint(v) => v[i],
            };
            let nx: f64 = rng.sample(StandardNormal);
            let ny: f64 = rng.sample(StandardNormal);
            Point::new(p.x + std * range.x * nx, p.y + std * range.y * ny)
        })
        .collect();

    alignment(source, &Shape::new(points))
}

/// Perturbs the alignment between `shape`'s bounding box and `bounding_box`
/// and returns `shape` moved by it.
pub fn noisy_shape_from_bounding_box<R: Rng + ?Sized>(
    shape: &Shape,
    bounding_box: &Shape,
    options: &PerturbOptions,
    rng: &mut R,
) -> Result<Shape> {
    let transform =
        noisy_alignment_similarity_transform(&shape.bounding_box(), bounding_box, options, rng)?;
    Ok(transform.apply(shape))
}

/// Perturbs the alignment between `reference_shape` and `shape` and returns
/// `reference_shape` moved by it.
pub fn noisy_shape_from_shape<R: Rng + ?Sized>(
    reference_shape: &Shape,
    shape: &Shape,
    options: &PerturbOptions,
    rng: &mut R,
) -> Result<Shape> {
    let transform = noisy_alignment_similarity_transform(reference_shape, shape, options, rng)?;
    Ok(transform.apply(reference_shape))
}

/// [`noisy_shape_from_bounding_box`] as a two-argument perturbation function
/// suitable for the fitters and the perturbation-set generator.
pub fn bounding_box_perturbation<'a, R: Rng + ?Sized>(
    options: PerturbOptions,
    rng: &'a mut R,
) -> impl FnMut(&Shape, &Shape) -> Result<Shape> + 'a {
    move |shape: &Shape, bounding_box: &Shape| {
        noisy_shape_from_bounding_box(shape, bounding_box, &options, &mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{affine_alignment, similarity_alignment};
    use crate::types::BoundingBox;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn face_like() -> Shape {
        Shape::new(vec![
            Point::new(30.0, 30.0),
            Point::new(70.0, 30.0),
            Point::new(50.0, 55.0),
            Point::new(35.0, 75.0),
            Point::new(65.0, 75.0),
        ])
    }

    fn assert_transforms_close(a: &AffineTransform, b: &AffineTransform) {
        for (x, y) in a.matrix().iter().zip(b.matrix().iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn noise_type_parsing() {
        assert_eq!("uniform".parse::<NoiseType>().unwrap(), NoiseType::Uniform);
        assert_eq!("gaussian".parse::<NoiseType>().unwrap(), NoiseType::Gaussian);

        let err = "laplace".parse::<NoiseType>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gaussian") && msg.contains("uniform"), "{}", msg);
    }

    #[test]
    fn noise_percentage_shapes() {
        assert_eq!(NoisePercentage::from_slice(&[0.2]).unwrap(), NoisePercentage::from(0.2));
        let p = NoisePercentage::from_slice(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!((p.scale(), p.rotation(), p.translation()), (0.1, 0.2, 0.3));
        assert!(matches!(
            NoisePercentage::from_slice(&[0.1, 0.2]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(NoisePercentage::from_slice(&[]).is_err());

        let parsed: NoisePercentage = serde_json::from_str("0.1").unwrap();
        assert_eq!(parsed, NoisePercentage::from(0.1));
        let parsed: NoisePercentage = serde_json::from_str("[0.1, 0.0, 0.2]").unwrap();
        assert_eq!(parsed, NoisePercentage::new(0.1, 0.0, 0.2));
        assert!(serde_json::from_str::<NoisePercentage>("[0.1, 0.2]").is_err());
    }

    #[test]
    fn zero_noise_reproduces_alignment() {
        let source = face_like();
        let target = BoundingBox::new(200.0, 100.0, 80.0, 90.0).to_shape();
        let source_bb = source.bounding_box();
        let mut rng = StdRng::seed_from_u64(7);

        for noise_type in [NoiseType::Uniform, NoiseType::Gaussian] {
            for rotation in [false, true] {
                let options = PerturbOptions::new(noise_type, 0.0).with_rotation(rotation);
                let noisy =
                    noisy_alignment_similarity_transform(&source_bb, &target, &options, &mut rng)
                        .unwrap();
                let exact = align_similarity(&source_bb, &target, rotation).unwrap();
                assert_transforms_close(&noisy, &exact);
            }
        }
    }

    #[test]
    fn zero_noise_shape_from_bounding_box_fills_target() {
        let shape = face_like();
        // same aspect ratio as the shape's box so a similarity can fit it exactly
        let target = BoundingBox::new(10.0, 20.0, 80.0, 90.0).to_shape();
        let mut rng = StdRng::seed_from_u64(1);
        let options = PerturbOptions::new(NoiseType::Gaussian, [0.0, 0.0, 0.0]);

        let noisy = noisy_shape_from_bounding_box(&shape, &target, &options, &mut rng).unwrap();
        let bb = noisy.bounding_box();
        for (p, q) in bb.points.iter().zip(target.points.iter()) {
            assert_abs_diff_eq!(p.x, q.x, epsilon = 1e-9);
            assert_abs_diff_eq!(p.y, q.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn zero_noise_shape_from_shape_matches_alignment() {
        let reference = face_like();
        let target = AffineTransform::translation(Point::new(40.0, -5.0))
            .compose_after(&AffineTransform::scale_about_centre(&reference, 1.7))
            .apply(&reference);
        let mut rng = StdRng::seed_from_u64(3);
        let options = PerturbOptions::new(NoiseType::Uniform, 0.0);

        let noisy = noisy_shape_from_shape(&reference, &target, &options, &mut rng).unwrap();
        let exact = align_similarity(&reference, &target, false)
            .unwrap()
            .apply(&reference);
        for (p, q) in noisy.points.iter().zip(exact.points.iter()) {
            assert_abs_diff_eq!(p.x, q.x, epsilon = 1e-9);
            assert_abs_diff_eq!(p.y, q.y, epsilon = 1e-9);
        }
        for (p, q) in noisy.points.iter().zip(target.points.iter()) {
            assert_abs_diff_eq!(p.x, q.x, epsilon = 1e-9);
            assert_abs_diff_eq!(p.y, q.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn uniform_scale_noise_is_bounded() {
        let shape = face_like();
        let target = BoundingBox::new(0.0, 0.0, 100.0, 112.5).to_shape();
        let mut rng = StdRng::seed_from_u64(11);
        let options = PerturbOptions::new(NoiseType::Uniform, [0.1, 0.0, 0.0]);

        let mut saw_change = false;
        for _ in 0..200 {
            let noisy = noisy_shape_from_bounding_box(&shape, &target, &options, &mut rng).unwrap();
            let ratio = noisy.range().x / 100.0;
            assert!((0.95 - 1e-9..=1.05 + 1e-9).contains(&ratio), "ratio {}", ratio);
            saw_change |= (ratio - 1.0).abs() > 1e-3;
        }
        assert!(saw_change);
    }

    #[test]
    fn uniform_translation_noise_is_bounded() {
        let target = BoundingBox::new(0.0, 0.0, 100.0, 50.0).to_shape();
        let mut rng = StdRng::seed_from_u64(5);
        let options = PerturbOptions::new(NoiseType::Uniform, [0.0, 0.0, 0.2]);

        for _ in 0..200 {
            let t = noisy_alignment_similarity_transform(&target, &target, &options, &mut rng)
                .unwrap();
            let shift = t.translation_part();
            assert!(shift.x.abs() <= 20.0 + 1e-9);
            assert!(shift.y.abs() <= 10.0 + 1e-9);
        }
    }

    #[test]
    fn gaussian_noise_is_centred() {
        let target = BoundingBox::new(0.0, 0.0, 100.0, 100.0).to_shape();
        let mut rng = StdRng::seed_from_u64(99);
        let options = PerturbOptions::new(NoiseType::Gaussian, [0.0, 0.0, 0.1]);

        let n = 2000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let t = noisy_alignment_similarity_transform(&target, &target, &options, &mut rng)
                .unwrap();
            let x = t.translation_part().x;
            sum += x;
            sum_sq += x * x;
        }
        let mean = sum / n as f64;
        let std = (sum_sq / n as f64 - mean * mean).sqrt();
        // expected std: 0.1 * 100 = 10
        assert!(mean.abs() < 1.0, "mean {}", mean);
        assert!((std - 10.0).abs() < 1.0, "std {}", std);
    }

    #[test]
    fn noisy_target_alignment() {
        let source = face_like();
        let target = AffineTransform::translation(Point::new(3.0, 4.0)).apply(&source);
        let mut rng = StdRng::seed_from_u64(2);

        // no noise: exact alignment
        let t = noisy_target_alignment_transform(
            &source,
            &target,
            affine_alignment,
            &NoiseStd::Uniform(0.0),
            &mut rng,
        )
        .unwrap();
        assert_abs_diff_eq!(t.translation_part().x, 3.0, epsilon = 1e-9);

        // noise: still a valid transform, close to the exact one
        let t = noisy_target_alignment_transform(
            &source,
            &target,
            similarity_alignment,
            &NoiseStd::PerPoint(vec![0.01; 5]),
            &mut rng,
        )
        .unwrap();
        assert!(t.apply(&source).mean_distance(&target) < 5.0);

        let err = noisy_target_alignment_transform(
            &source,
            &target,
            similarity_alignment,
            &NoiseStd::PerPoint(vec![0.01; 2]),
            &mut rng,
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn perturbation_closure() {
        let shape = face_like();
        let target = BoundingBox::new(0.0, 0.0, 40.0, 45.0).to_shape();
        let mut rng = StdRng::seed_from_u64(8);
        let mut perturb = bounding_box_perturbation(PerturbOptions::default(), &mut rng);
        let a = perturb(&shape, &target).unwrap();
        let b = perturb(&shape, &target).unwrap();
        assert_eq!(a.n_points(), shape.n_points());
        assert_ne!(a, b);
    }
}
