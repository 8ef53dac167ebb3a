use crate::error::Result;
use crate::image::Image;
use crate::types::Shape;

/// An iterative fitting algorithm that runs at a single scale.
///
/// Implementations receive the feature image of their pyramid level and an
/// initial shape in that level's coordinates, and must not run more than
/// `max_iters` iterations.
pub trait Algorithm {
    fn run(
        &self,
        image: &Image,
        initial_shape: &Shape,
        gt_shape: Option<&Shape>,
        max_iters: usize,
    ) -> Result<AlgorithmResult>;
}

impl<A: Algorithm + ?Sized> Algorithm for Box<A> {
    fn run(
        &self,
        image: &Image,
        initial_shape: &Shape,
        gt_shape: Option<&Shape>,
        max_iters: usize,
    ) -> Result<AlgorithmResult> {
        (**self).run(image, initial_shape, gt_shape, max_iters)
    }
}

/// Outcome of one scale's run: the shape after every iteration, in the
/// coordinate frame of the level image the algorithm ran on.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmResult {
    initial_shape: Shape,
    shapes: Vec<Shape>,
    gt_shape: Option<Shape>,
}

impl AlgorithmResult {
    /// `shapes` holds one entry per iteration; an empty trajectory means the
    /// algorithm stopped immediately and the final shape is the initial one.
    pub fn new(initial_shape: Shape, shapes: Vec<Shape>, gt_shape: Option<Shape>) -> Self {
        Self {
            initial_shape,
            shapes,
            gt_shape,
        }
    }

    pub fn initial_shape(&self) -> &Shape {
        &self.initial_shape
    }

    pub fn final_shape(&self) -> &Shape {
        self.shapes.last().unwrap_or(&self.initial_shape)
    }

    /// Iteration trajectory, excluding the initial shape.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn n_iters(&self) -> usize {
        self.shapes.len()
    }

    pub fn gt_shape(&self) -> Option<&Shape> {
        self.gt_shape.as_ref()
    }

    /// Mean point-to-point distance between the final shape and the ground
    /// truth, if one was given.
    pub fn final_error(&self) -> Option<f64> {
        self.gt_shape
            .as_ref()
            .map(|gt| self.final_shape().mean_distance(gt))
    }
}
