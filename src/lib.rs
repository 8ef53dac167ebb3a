//! # percent-fit
//!
//! Pure Rust multi-scale deformable model fitting.
//!
//! This crate provides:
//! - **Fitting**: coarse-to-fine fitting of a shape to an image over a
//!   pyramid of feature images, driven by pluggable per-scale algorithms
//! - **Perturbations**: noisy similarity alignments used to synthesise
//!   realistic initialisations from ground-truth shapes and bounding boxes
//! - **Perturbation Sets**: batch generation of perturbed bounding boxes
//!   attached to images as landmark groups
//!
//! ## Algorithm Overview
//!
//! 1. Align the model's reference shape to a bounding box (or start from a
//!    given shape)
//! 2. Crop and rescale the image so the shape matches the reference scale
//! 3. For each scale, coarsest first:
//!    - Compute the scale's holistic feature image and resample it
//!    - Run the scale's algorithm from the previous scale's result
//! 4. Map every result back to the original image coordinates
//!
//! ## Quick Start
//!
//! ```rust
//! use percent_fit::{
//!     default_5_point_reference_shape, features, Algorithm, AlgorithmResult,
//!     BoundingBox, FitOptions, Image, ModelFitter, MultiFitter, MultiScaleModel,
//!     Shape,
//! };
//!
//! // An algorithm that keeps its initial shape
//! struct Static;
//!
//! impl Algorithm for Static {
//!     fn run(
//!         &self,
//!         _image: &Image,
//!         initial_shape: &Shape,
//!         gt_shape: Option<&Shape>,
//!         _max_iters: usize,
//!     ) -> percent_fit::Result<AlgorithmResult> {
//!         Ok(AlgorithmResult::new(initial_shape.clone(), vec![], gt_shape.cloned()))
//!     }
//! }
//!
//! let model = MultiScaleModel::builder()
//!     .reference_shape(default_5_point_reference_shape())
//!     .scales_with_feature(&[0.5, 1.0], features::no_op())
//!     .build()
//!     .unwrap();
//! let fitter = ModelFitter::new(model, vec![Box::new(Static), Box::new(Static)]).unwrap();
//!
//! let image = Image::from_fn(320, 240, |x, y| ((x + y) % 256) as f32 / 255.0).unwrap();
//! let face_rect = BoundingBox::new(100.0, 50.0, 120.0, 135.0);
//!
//! let result = fitter
//!     .fit_from_bb(&image, &face_rect.to_shape(), &FitOptions::new().max_iters(10usize))
//!     .unwrap();
//! println!("Final shape has {} points", result.final_shape().n_points());
//! ```
//!
//! ## Perturbed Initialisations
//!
//! ```rust
//! use percent_fit::{
//!     generate_perturbations_from_gt, bounding_box_perturbation, BoundingBox, Image,
//!     NoiseType, PerturbOptions,
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut image = Image::zeros(200, 200, 1).unwrap();
//! image.landmarks.insert("gt", BoundingBox::new(40.0, 50.0, 80.0, 90.0).to_shape());
//! let mut images = vec![image];
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let options = PerturbOptions::new(NoiseType::Gaussian, [0.04, 0.02, 0.04]);
//! let boxes = generate_perturbations_from_gt(
//!     &mut images,
//!     5,
//!     bounding_box_perturbation(options, &mut rng),
//!     "gt",
//!     None,
//!     false,
//! )
//! .unwrap();
//! assert_eq!(boxes(&images[0]).len(), 5);
//! ```

mod algorithm;
mod align;
mod checks;
mod config;
mod error;
pub mod features;
mod fitter;
mod generate;
mod image;
mod landmarks;
mod model;
mod perturb;
mod progress;
mod result;
mod transform;
mod types;

pub use algorithm::{Algorithm, AlgorithmResult};
pub use align::{
    affine_alignment, align_affine, align_shape_with_bounding_box, align_similarity,
    align_uniform_scale, similarity_alignment,
};
pub use checks::{check_crop_proportion, check_max_iters, check_scales, MaxIters};
pub use config::PerturbationConfig;
pub use error::{Error, Result};
pub use features::HolisticFeature;
pub use fitter::{FitOptions, ModelFitter, MultiFitter, PyramidLevel};
pub use generate::{generate_perturbations_from_gt, generated_bounding_boxes, GENERATED_BB_PREFIX};
pub use crate::image::Image;
pub use landmarks::{glob_match, LandmarkGroups};
pub use model::{default_5_point_reference_shape, Model, MultiScaleModel, MultiScaleModelBuilder};
pub use perturb::{
    bounding_box_perturbation, noisy_alignment_similarity_transform, noisy_shape_from_bounding_box,
    noisy_shape_from_shape, noisy_target_alignment_transform, NoisePercentage, NoiseStd, NoiseType,
    PerturbOptions,
};
pub use progress::{print_progress, Progress};
pub use result::MultiScaleResult;
pub use transform::AffineTransform;
pub use types::{BoundingBox, Point, Shape};
