//! Multi-scale fitting.
//!
//! ## Algorithm Overview
//!
//! 1. Crop the image around the initial shape (optional) and rescale it so
//!    that the initial shape has the spread of the reference shape
//! 2. For each scale, coarsest first:
//!    - Compute the holistic feature image (reused when the feature is the
//!      same function as the previous scale's)
//!    - Resample it by the scale factor (skipped for a factor of 1)
//! 3. Run each scale's algorithm, seeding it with the previous scale's final
//!    shape rescaled by the ratio of the two scale factors
//! 4. Package the per-scale results with the affine correction that maps the
//!    finest level back onto the original image

use log::debug;

use crate::algorithm::{Algorithm, AlgorithmResult};
use crate::align::{align_shape_with_bounding_box, similarity_alignment};
use crate::checks::{check_crop_proportion, check_max_iters, MaxIters};
use crate::error::{Error, Result};
use crate::features::HolisticFeature;
use crate::image::Image;
use crate::model::Model;
use crate::perturb::{bounding_box_perturbation, PerturbOptions};
use crate::result::MultiScaleResult;
use crate::transform::AffineTransform;
use crate::types::Shape;

/// Per-call fitting options.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Iteration budget, for all scales or per scale.
    pub max_iters: MaxIters,
    /// Ground truth, forwarded to the algorithms and kept in the result.
    pub gt_shape: Option<Shape>,
    /// Crop the image to the initial shape plus a border of this proportion
    /// of its smallest extent. `None` disables cropping.
    pub crop_image: Option<f64>,
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iters(mut self, max_iters: impl Into<MaxIters>) -> Self {
        self.max_iters = max_iters.into();
        self
    }

    pub fn gt_shape(mut self, gt_shape: Shape) -> Self {
        self.gt_shape = Some(gt_shape);
        self
    }

    pub fn crop_image(mut self, proportion: f64) -> Self {
        self.crop_image = Some(proportion);
        self
    }
}

/// One level of the fitting pyramid.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub image: Image,
    pub initial_shape: Shape,
    pub gt_shape: Option<Shape>,
    pub scale: f64,
    /// Maps original image coordinates into this level's coordinates.
    pub transform: AffineTransform,
}

/// A coarse-to-fine fitter: a reference shape, a holistic feature, a scale
/// factor and an algorithm per scale.
pub trait MultiFitter {
    fn reference_shape(&self) -> &Shape;
    fn holistic_features(&self) -> &[HolisticFeature];
    fn scales(&self) -> &[f64];
    fn algorithms(&self) -> &[Box<dyn Algorithm>];

    fn n_scales(&self) -> usize {
        self.scales().len()
    }

    /// Fit starting from the reference shape aligned to `bounding_box`.
    fn fit_from_bb(
        &self,
        image: &Image,
        bounding_box: &Shape,
        options: &FitOptions,
    ) -> Result<MultiScaleResult> {
        let initial_shape = align_shape_with_bounding_box(
            self.reference_shape(),
            bounding_box,
            similarity_alignment,
        )?;
        self.fit_from_shape(image, &initial_shape, options)
    }

    /// Fit starting from `initial_shape`, given in `image` coordinates.
    fn fit_from_shape(
        &self,
        image: &Image,
        initial_shape: &Shape,
        options: &FitOptions,
    ) -> Result<MultiScaleResult> {
        check_configuration(self)?;
        let max_iters = check_max_iters(&options.max_iters, self.n_scales())?;
        let crop_image = check_crop_proportion(options.crop_image)?;
        if let Some(gt_shape) = &options.gt_shape {
            if gt_shape.n_points() != initial_shape.n_points() {
                return Err(Error::InvalidArgument(format!(
                    "ground-truth shape has {} points, initial shape has {}",
                    gt_shape.n_points(),
                    initial_shape.n_points()
                )));
            }
        }

        let levels =
            self.prepare_image(image, initial_shape, options.gt_shape.as_ref(), crop_image)?;

        let finest = levels.last().ok_or_else(|| {
            Error::InvalidModel("at least one scale is required".into())
        })?;
        let affine_correction = finest.transform.inverse().ok_or_else(|| {
            Error::DegenerateAlignment("pyramid transform is not invertible".into())
        })?;

        let algorithm_results = self.fit_levels(&levels, &max_iters)?;

        Ok(MultiScaleResult::new(
            image.clone(),
            algorithm_results,
            self.scales().to_vec(),
            affine_correction,
            initial_shape.clone(),
            options.gt_shape.clone(),
        ))
    }

    /// Build the pyramid, coarsest level first.
    fn prepare_image(
        &self,
        image: &Image,
        initial_shape: &Shape,
        gt_shape: Option<&Shape>,
        crop_image: Option<f64>,
    ) -> Result<Vec<PyramidLevel>> {
        let reference_shape = self.reference_shape();

        let (normalized, to_normalized) = match crop_image {
            Some(proportion) => {
                let (cropped, to_cropped) =
                    image.crop_to_shape_proportion(initial_shape, proportion)?;
                let (rescaled, to_rescaled) =
                    cropped.rescale_to_shape(reference_shape, &to_cropped.apply(initial_shape))?;
                (rescaled, to_rescaled.compose_after(&to_cropped))
            }
            None => image.rescale_to_shape(reference_shape, initial_shape)?,
        };
        debug!(
            "prepare_image: {}x{} -> {}x{} (crop {:?})",
            image.width(),
            image.height(),
            normalized.width(),
            normalized.height(),
            crop_image
        );

        let features = self.holistic_features();
        let scales = self.scales();
        let mut levels = Vec::with_capacity(scales.len());
        let mut previous: Option<Image> = None;

        for (i, (feature, &scale)) in features.iter().zip(scales.iter()).enumerate() {
            let feature_image = match previous.take() {
                Some(img) if i > 0 && feature.ptr_eq(&features[i - 1]) => img,
                _ => {
                    debug!(
                        "prepare_image: computing '{}' features for scale {}",
                        feature.name(),
                        i
                    );
                    feature.compute(&normalized)?
                }
            };

            let (level_image, transform) = if scale != 1.0 {
                let (scaled, to_scaled) = feature_image.rescale(scale)?;
                (scaled, to_scaled.compose_after(&to_normalized))
            } else {
                (feature_image.clone(), to_normalized)
            };

            levels.push(PyramidLevel {
                initial_shape: transform.apply(initial_shape),
                gt_shape: gt_shape.map(|gt| transform.apply(gt)),
                image: level_image,
                scale,
                transform,
            });
            previous = Some(feature_image);
        }

        Ok(levels)
    }

    /// Run every scale's algorithm in order, handing each final shape to the
    /// next scale.
    fn fit_levels(
        &self,
        levels: &[PyramidLevel],
        max_iters: &[usize],
    ) -> Result<Vec<AlgorithmResult>> {
        let algorithms = self.algorithms();
        let scales = self.scales();
        if levels.len() != algorithms.len() {
            return Err(Error::ConfigurationMismatch {
                what: "pyramid levels (one per algorithm)",
                expected: algorithms.len(),
                actual: levels.len(),
            });
        }
        if max_iters.len() != levels.len() {
            return Err(Error::ConfigurationMismatch {
                what: "max_iters entries (one per scale)",
                expected: levels.len(),
                actual: max_iters.len(),
            });
        }

        let mut shape = match levels.first() {
            Some(level) => level.initial_shape.clone(),
            None => return Ok(Vec::new()),
        };
        let mut algorithm_results = Vec::with_capacity(levels.len());

        for (i, level) in levels.iter().enumerate() {
            debug!(
                "fit_levels: scale {} ({}), {}x{}, max_iters {}",
                i,
                level.scale,
                level.image.width(),
                level.image.height(),
                max_iters[i]
            );
            let result =
                algorithms[i].run(&level.image, &shape, level.gt_shape.as_ref(), max_iters[i])?;

            shape = result.final_shape().clone();
            if i + 1 < levels.len() {
                let ratio = scales[i + 1] / scales[i];
                if ratio != 1.0 {
                    shape = AffineTransform::scale(ratio).apply(&shape);
                }
            }
            algorithm_results.push(result);
        }

        Ok(algorithm_results)
    }
}

fn check_configuration<F: MultiFitter + ?Sized>(fitter: &F) -> Result<()> {
    let n_scales = fitter.n_scales();
    if n_scales == 0 {
        return Err(Error::InvalidModel("at least one scale is required".into()));
    }
    if fitter.holistic_features().len() != n_scales {
        return Err(Error::ConfigurationMismatch {
            what: "holistic features (one per scale)",
            expected: n_scales,
            actual: fitter.holistic_features().len(),
        });
    }
    if fitter.algorithms().len() != n_scales {
        return Err(Error::ConfigurationMismatch {
            what: "algorithms (one per scale)",
            expected: n_scales,
            actual: fitter.algorithms().len(),
        });
    }
    Ok(())
}

/// A [`MultiFitter`] whose reference shape, features and scales come from a
/// [`Model`].
pub struct ModelFitter<M> {
    model: M,
    algorithms: Vec<Box<dyn Algorithm>>,
}

impl<M: Model> ModelFitter<M> {
    /// `algorithms` must hold one algorithm per model scale, coarsest first.
    pub fn new(model: M, algorithms: Vec<Box<dyn Algorithm>>) -> Result<Self> {
        if algorithms.len() != model.n_scales() {
            return Err(Error::ConfigurationMismatch {
                what: "algorithms (one per scale)",
                expected: model.n_scales(),
                actual: algorithms.len(),
            });
        }
        Ok(Self { model, algorithms })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Perturbed version of `gt_shape`, obtained from the alignment between
    /// its bounding box and `bb`. Useful for synthesising initial shapes.
    pub fn perturb_from_bb<F>(&self, gt_shape: &Shape, bb: &Shape, perturb_func: F) -> Result<Shape>
    where
        F: FnOnce(&Shape, &Shape) -> Result<Shape>,
    {
        perturb_func(gt_shape, bb)
    }

    /// Perturbed version of the ground-truth bounding box itself.
    pub fn perturb_from_gt_bb<F>(&self, gt_bb: &Shape, perturb_func: F) -> Result<Shape>
    where
        F: FnOnce(&Shape, &Shape) -> Result<Shape>,
    {
        perturb_func(gt_bb, gt_bb)
    }

    /// The default perturbation: `noisy_shape_from_bounding_box` with
    /// default options.
    pub fn default_perturbation<'a, R: rand::Rng + ?Sized>(
        rng: &'a mut R,
    ) -> impl FnMut(&Shape, &Shape) -> Result<Shape> + 'a {
        bounding_box_perturbation(PerturbOptions::default(), rng)
    }
}

impl<M: Model> MultiFitter for ModelFitter<M> {
    fn reference_shape(&self) -> &Shape {
        self.model.reference_shape()
    }

    fn holistic_features(&self) -> &[HolisticFeature] {
        self.model.holistic_features()
    }

    fn scales(&self) -> &[f64] {
        self.model.scales()
    }

    fn algorithms(&self) -> &[Box<dyn Algorithm>] {
        &self.algorithms
    }
}
