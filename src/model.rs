use crate::checks::check_scales;
use crate::error::{Error, Result};
use crate::features::HolisticFeature;
use crate::types::{Point, Shape};

/// What a multi-scale fitter needs from a deformable model.
///
/// `holistic_features()` and `scales()` have one entry per scale, ordered
/// from the coarsest scale to the finest.
pub trait Model {
    fn reference_shape(&self) -> &Shape;
    fn holistic_features(&self) -> &[HolisticFeature];
    fn scales(&self) -> &[f64];

    fn n_scales(&self) -> usize {
        self.scales().len()
    }
}

impl<M: Model + ?Sized> Model for &M {
    fn reference_shape(&self) -> &Shape {
        (**self).reference_shape()
    }

    fn holistic_features(&self) -> &[HolisticFeature] {
        (**self).holistic_features()
    }

    fn scales(&self) -> &[f64] {
        (**self).scales()
    }
}

/// A plain model: a reference shape plus a feature and scale per level.
#[derive(Debug, Clone)]
pub struct MultiScaleModel {
    reference_shape: Shape,
    holistic_features: Vec<HolisticFeature>,
    scales: Vec<f64>,
}

impl MultiScaleModel {
    pub fn builder() -> MultiScaleModelBuilder {
        MultiScaleModelBuilder::new()
    }
}

impl Model for MultiScaleModel {
    fn reference_shape(&self) -> &Shape {
        &self.reference_shape
    }

    fn holistic_features(&self) -> &[HolisticFeature] {
        &self.holistic_features
    }

    fn scales(&self) -> &[f64] {
        &self.scales
    }
}

/// Builder for a [`MultiScaleModel`].
///
/// # Usage
///
/// ```
/// use percent_fit::{features, default_5_point_reference_shape, MultiScaleModel};
///
/// let model = MultiScaleModel::builder()
///     .reference_shape(default_5_point_reference_shape())
///     .add_scale(0.5, features::no_op())
///     .add_scale(1.0, features::no_op())
///     .build()
///     .unwrap();
/// ```
pub struct MultiScaleModelBuilder {
    reference_shape: Option<Shape>,
    holistic_features: Vec<HolisticFeature>,
    scales: Vec<f64>,
}

impl MultiScaleModelBuilder {
    pub fn new() -> Self {
        Self {
            reference_shape: None,
            holistic_features: Vec::new(),
            scales: Vec::new(),
        }
    }

    pub fn reference_shape(mut self, shape: Shape) -> Self {
        self.reference_shape = Some(shape);
        self
    }

    /// Append a level. Levels must be added from coarsest to finest.
    pub fn add_scale(mut self, scale: f64, feature: HolisticFeature) -> Self {
        self.scales.push(scale);
        self.holistic_features.push(feature);
        self
    }

    /// Use `feature` at every one of `scales`. All levels share the same
    /// feature instance, so its image is computed once per fit.
    pub fn scales_with_feature(mut self, scales: &[f64], feature: HolisticFeature) -> Self {
        for &scale in scales {
            self.scales.push(scale);
            self.holistic_features.push(feature.clone());
        }
        self
    }

    pub fn build(self) -> Result<MultiScaleModel> {
        let reference_shape = self
            .reference_shape
            .ok_or_else(|| Error::InvalidModel("Missing reference shape".into()))?;
        if reference_shape.is_empty() {
            return Err(Error::InvalidModel("Reference shape has no points".into()));
        }
        check_scales(&self.scales)?;

        Ok(MultiScaleModel {
            reference_shape,
            holistic_features: self.holistic_features,
            scales: self.scales,
        })
    }
}

impl Default for MultiScaleModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple 5-point face shape, about 100 pixels across.
/// Points: left eye centre, right eye centre, nose tip, left mouth corner,
/// right mouth corner.
pub fn default_5_point_reference_shape() -> Shape {
    Shape::new(vec![
        Point::new(30.0, 30.0), // left eye
        Point::new(70.0, 30.0), // right eye
        Point::new(50.0, 55.0), // nose tip
        Point::new(35.0, 75.0), // left mouth
        Point::new(65.0, 75.0), // right mouth
    ])
}
