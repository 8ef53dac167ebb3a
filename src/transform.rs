//! 2D affine transforms stored as 3×3 homogeneous matrices.
//!
//! `a.compose_after(&b)` is the transform that applies `b` first and then
//! `a` (matrix product `A·B`). Composition is associative but not
//! commutative, so the order in which perturbation components are chained
//! matters.

use nalgebra::{Matrix3, Vector3};

use crate::types::{Point, Shape};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    h: Matrix3<f64>,
}

impl AffineTransform {
    /// Build from a homogeneous matrix. The last row is forced to `[0, 0, 1]`.
    pub fn from_matrix(mut h: Matrix3<f64>) -> Self {
        h[(2, 0)] = 0.0;
        h[(2, 1)] = 0.0;
        h[(2, 2)] = 1.0;
        Self { h }
    }

    /// Build from the linear part `[[a, b], [c, d]]` and translation `(tx, ty)`.
    pub fn from_parts(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self {
            h: Matrix3::new(a, b, tx, c, d, ty, 0.0, 0.0, 1.0),
        }
    }

    pub fn identity() -> Self {
        Self {
            h: Matrix3::identity(),
        }
    }

    pub fn translation(t: Point) -> Self {
        Self::from_parts(1.0, 0.0, 0.0, 1.0, t.x, t.y)
    }

    /// Uniform scale about the origin.
    pub fn scale(factor: f64) -> Self {
        Self::from_parts(factor, 0.0, 0.0, factor, 0.0, 0.0)
    }

    /// Uniform scale about the centroid of `shape`.
    pub fn scale_about_centre(shape: &Shape, factor: f64) -> Self {
        Self::about(shape.centroid(), Self::scale(factor))
    }

    /// Counter-clockwise rotation (in the x-right, y-up convention) by
    /// `degrees` about the centroid of `shape`.
    pub fn rotate_ccw_about_centre(shape: &Shape, degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Self::about(
            shape.centroid(),
            Self::from_parts(c, -s, s, c, 0.0, 0.0),
        )
    }

    fn about(centre: Point, linear: Self) -> Self {
        Self::translation(centre)
            .compose_after(&linear)
            .compose_after(&Self::translation(centre * -1.0))
    }

    /// `self ∘ other`: apply `other`, then `self`.
    pub fn compose_after(&self, other: &AffineTransform) -> Self {
        Self { h: self.h * other.h }
    }

    /// `other ∘ self`: apply `self`, then `other`.
    pub fn compose_before(&self, other: &AffineTransform) -> Self {
        other.compose_after(self)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::from_matrix)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.h
    }

    pub fn translation_part(&self) -> Point {
        Point::new(self.h[(0, 2)], self.h[(1, 2)])
    }

    pub fn apply_point(&self, p: Point) -> Point {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point::new(v[0], v[1])
    }

    pub fn apply(&self, shape: &Shape) -> Shape {
        Shape::new(shape.points.iter().map(|p| self.apply_point(*p)).collect())
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}
