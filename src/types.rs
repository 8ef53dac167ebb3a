use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn norm_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// An axis-aligned box defined by top-left corner, width, and height.
///
/// Perturbed boxes may be rotated, so the fitting code carries boxes as
/// 4-point [`Shape`]s; this type is the convenient way to write one down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The four corners, in the same order as [`Shape::bounding_box`].
    pub fn to_shape(&self) -> Shape {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.width, self.y + self.height);
        Shape::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }
}

/// An ordered 2D point cloud: landmarks of a deformable object, or the
/// corners of a (possibly rotated) bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub points: Vec<Point>,
}

impl Shape {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_dims(&self) -> usize {
        2
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn centroid(&self) -> Point {
        if self.points.is_empty() {
            return Point::zero();
        }
        let mut sum = Point::zero();
        for p in &self.points {
            sum += *p;
        }
        sum * (1.0 / self.points.len() as f64)
    }

    /// Per-axis minimum and maximum.
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    /// Per-axis extent (`max - min`).
    pub fn range(&self) -> Point {
        if self.points.is_empty() {
            return Point::zero();
        }
        let (min, max) = self.bounds();
        max - min
    }

    /// Frobenius norm of the centred points.
    pub fn norm(&self) -> f64 {
        let c = self.centroid();
        self.points
            .iter()
            .map(|p| (*p - c).norm_squared())
            .sum::<f64>()
            .sqrt()
    }

    /// Axis-aligned bounding box as a 4-point shape:
    /// `(min.x, min.y)`, `(max.x, min.y)`, `(max.x, max.y)`, `(min.x, max.y)`.
    pub fn bounding_box(&self) -> Shape {
        self.bounds_rect().to_shape()
    }

    pub fn bounds_rect(&self) -> BoundingBox {
        if self.points.is_empty() {
            return BoundingBox::new(0.0, 0.0, 0.0, 0.0);
        }
        let (min, max) = self.bounds();
        BoundingBox::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Mean point-to-point Euclidean distance to another shape with the same
    /// number of points.
    pub fn mean_distance(&self, other: &Shape) -> f64 {
        debug_assert_eq!(self.points.len(), other.points.len());
        if self.points.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .points
            .iter()
            .zip(other.points.iter())
            .map(|(a, b)| a.distance(b))
            .sum();
        total / self.points.len() as f64
    }

    /// Flatten shape to a vector of [x0, y0, x1, y1, ...] coordinates.
    pub fn to_flat_vec(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(self.points.len() * 2);
        for p in &self.points {
            v.push(p.x);
            v.push(p.y);
        }
        v
    }

    /// Create shape from a flat vector of [x0, y0, x1, y1, ...] coordinates.
    pub fn from_flat_vec(v: &[f64]) -> Self {
        debug_assert!(v.len() % 2 == 0);
        let points: Vec<Point> = v
            .chunks_exact(2)
            .map(|chunk| Point::new(chunk[0], chunk[1]))
            .collect();
        Self { points }
    }
}

impl From<BoundingBox> for Shape {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_shape()
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

impl std::ops::IndexMut<usize> for Shape {
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.points[idx]
    }
}
