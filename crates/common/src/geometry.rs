//! Geometric primitives: points, rectangles, affine transforms and paths.
//!
//! All coordinates are in canvas pixel space with the origin at the top-left
//! corner and y growing downwards, so a positive rotation angle turns
//! clockwise on screen.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::{Add, Mul, Sub};

/// A 2D point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point at parameter `t` along the segment from `self` to `other`.
    #[inline]
    pub fn lerp(&self, other: Point, t: f32) -> Point {
        *self + (other - *self) * t
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// A 2D rectangle anchored at its top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const ZERO: Rect = Rect { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle of the given size centered on `center`.
    #[inline]
    pub fn from_center(center: Point, width: f32, height: f32) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Half-open containment: the right and bottom edges are outside.
    #[inline]
    pub fn contains_point(&self, point: Point) -> bool {
        (self.x..self.right()).contains(&point.x) && (self.y..self.bottom()).contains(&point.y)
    }

    /// Closed-interval containment: points on any edge count as inside.
    #[inline]
    pub fn contains_point_inclusive(&self, point: Point) -> bool {
        (self.x..=self.right()).contains(&point.x) && (self.y..=self.bottom()).contains(&point.y)
    }

    /// Rectangle spanning two corners given in any order.
    pub fn from_points(a: Point, b: Point) -> Self {
        let (x, y) = (a.x.min(b.x), a.y.min(b.y));
        Rect::new(x, y, a.x.max(b.x) - x, a.y.max(b.y) - y)
    }

    /// Overlap of two rectangles, `None` if they only touch or are apart.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let overlap = Rect::from_points(
            Point::new(self.x.max(other.x), self.y.max(other.y)),
            Point::new(self.right().min(other.right()), self.bottom().min(other.bottom())),
        );
        let disjoint = self.right().min(other.right()) <= self.x.max(other.x)
            || self.bottom().min(other.bottom()) <= self.y.max(other.y);
        (!disjoint).then_some(overlap)
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_points(
            Point::new(self.x.min(other.x), self.y.min(other.y)),
            Point::new(self.right().max(other.right()), self.bottom().max(other.bottom())),
        )
    }

    #[inline]
    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow by `dx` on the left and right and `dy` on the top and bottom.
    #[inline]
    pub fn inflate(&self, dx: f32, dy: f32) -> Rect {
        Rect::from_center(self.center(), self.width + dx * 2.0, self.height + dy * 2.0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Smallest integer-aligned rectangle covering this one.
    pub fn round_out(&self) -> Rect {
        let x = self.x.floor();
        let y = self.y.floor();
        Rect::new(x, y, self.right().ceil() - x, self.bottom().ceil() - y)
    }
}

/// A 2D affine transformation matrix (row-vector convention).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub m11: f32,
    pub m12: f32,
    pub m21: f32,
    pub m22: f32,
    pub m31: f32,
    pub m32: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn identity() -> Self {
        Self {
            m11: 1.0,
            m12: 0.0,
            m21: 0.0,
            m22: 1.0,
            m31: 0.0,
            m32: 0.0,
        }
    }

    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            m31: x,
            m32: y,
            ..Self::identity()
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m11: sx,
            m22: sy,
            ..Self::identity()
        }
    }

    /// Rotation by `angle` radians around the origin.
    pub fn rotation(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            m11: cos,
            m12: sin,
            m21: -sin,
            m22: cos,
            m31: 0.0,
            m32: 0.0,
        }
    }

    /// Rotation by `degrees` pivoting around `center`.
    ///
    /// Equivalent to the canvas sequence translate(c), rotate, translate(-c).
    pub fn rotation_about(center: Point, degrees: f32) -> Self {
        Transform::translation(-center.x, -center.y)
            .then(&Transform::rotation(degrees.to_radians()))
            .then(&Transform::translation(center.x, center.y))
    }

    /// Compose: apply `self` first, then `other`.
    pub fn then(&self, other: &Transform) -> Transform {
        Transform {
            m11: self.m11 * other.m11 + self.m12 * other.m21,
            m12: self.m11 * other.m12 + self.m12 * other.m22,
            m21: self.m21 * other.m11 + self.m22 * other.m21,
            m22: self.m21 * other.m12 + self.m22 * other.m22,
            m31: self.m31 * other.m11 + self.m32 * other.m21 + other.m31,
            m32: self.m31 * other.m12 + self.m32 * other.m22 + other.m32,
        }
    }

    pub fn transform_point(&self, point: Point) -> Point {
        Point::new(
            self.m11 * point.x + self.m21 * point.y + self.m31,
            self.m12 * point.x + self.m22 * point.y + self.m32,
        )
    }

    /// Axis-aligned bounds of the transformed rectangle.
    pub fn transform_rect(&self, rect: Rect) -> Rect {
        let corners = [
            Point::new(rect.x, rect.y),
            Point::new(rect.right(), rect.y),
            Point::new(rect.x, rect.bottom()),
            Point::new(rect.right(), rect.bottom()),
        ]
        .map(|p| self.transform_point(p));

        let (mut min, mut max) = (corners[0], corners[0]);
        for p in &corners[1..] {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        Rect::from_points(min, max)
    }

    pub fn determinant(&self) -> f32 {
        self.m11 * self.m22 - self.m12 * self.m21
    }

    pub fn inverse(&self) -> Option<Transform> {
        let det = self.determinant();
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Transform {
            m11: self.m22 * inv_det,
            m12: -self.m12 * inv_det,
            m21: -self.m21 * inv_det,
            m22: self.m11 * inv_det,
            m31: (self.m21 * self.m32 - self.m22 * self.m31) * inv_det,
            m32: (self.m12 * self.m31 - self.m11 * self.m32) * inv_det,
        })
    }

    pub fn is_identity(&self) -> bool {
        let id = Self::identity();
        [
            self.m11 - id.m11,
            self.m12 - id.m12,
            self.m21 - id.m21,
            self.m22 - id.m22,
            self.m31,
            self.m32,
        ]
        .iter()
        .all(|d| d.abs() < f32::EPSILON)
    }
}

/// A single path element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathEl {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

/// A vector path built from move/line/curve commands.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    elements: SmallVec<[PathEl; 16]>,
}

/// Cubic bezier handle length for a quarter ellipse.
const KAPPA: f32 = 0.552_284_8;

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.elements.push(PathEl::MoveTo(Point::new(x, y)));
        self
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.elements.push(PathEl::LineTo(Point::new(x, y)));
        self
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) -> &mut Self {
        self.elements
            .push(PathEl::QuadTo(Point::new(cx, cy), Point::new(x, y)));
        self
    }

    pub fn cubic_to(&mut self, c1: Point, c2: Point, end: Point) -> &mut Self {
        self.elements.push(PathEl::CubicTo(c1, c2, end));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.elements.push(PathEl::Close);
        self
    }

    pub fn elements(&self) -> &[PathEl] {
        &self.elements
    }

    /// Closed rectangle path.
    pub fn rect(rect: Rect) -> Self {
        let mut path = Path::new();
        path.move_to(rect.x, rect.y)
            .line_to(rect.right(), rect.y)
            .line_to(rect.right(), rect.bottom())
            .line_to(rect.x, rect.bottom())
            .close();
        path
    }

    /// Rectangle with quadratic-curve corners of the given radius.
    ///
    /// The radius is clamped to half the shorter side so opposite corners
    /// never overlap.
    pub fn rounded_rect(rect: Rect, radius: f32) -> Self {
        let r = radius
            .max(0.0)
            .min(rect.width.abs() / 2.0)
            .min(rect.height.abs() / 2.0);
        if r <= 0.0 {
            return Path::rect(rect);
        }

        let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
        let mut path = Path::new();
        path.move_to(x + r, y)
            .line_to(x + w - r, y)
            .quad_to(x + w, y, x + w, y + r)
            .line_to(x + w, y + h - r)
            .quad_to(x + w, y + h, x + w - r, y + h)
            .line_to(x + r, y + h)
            .quad_to(x, y + h, x, y + h - r)
            .line_to(x, y + r)
            .quad_to(x, y, x + r, y)
            .close();
        path
    }

    /// Ellipse inscribed in `rect`.
    pub fn ellipse(rect: Rect) -> Self {
        let c = rect.center();
        let rx = rect.width / 2.0;
        let ry = rect.height / 2.0;
        let kx = rx * KAPPA;
        let ky = ry * KAPPA;

        let mut path = Path::new();
        path.move_to(c.x + rx, c.y)
            .cubic_to(
                Point::new(c.x + rx, c.y + ky),
                Point::new(c.x + kx, c.y + ry),
                Point::new(c.x, c.y + ry),
            )
            .cubic_to(
                Point::new(c.x - kx, c.y + ry),
                Point::new(c.x - rx, c.y + ky),
                Point::new(c.x - rx, c.y),
            )
            .cubic_to(
                Point::new(c.x - rx, c.y - ky),
                Point::new(c.x - kx, c.y - ry),
                Point::new(c.x, c.y - ry),
            )
            .cubic_to(
                Point::new(c.x + kx, c.y - ry),
                Point::new(c.x + rx, c.y - ky),
                Point::new(c.x + rx, c.y),
            )
            .close();
        path
    }

    /// Flatten curves into polylines whose deviation stays within `tolerance`.
    pub fn flatten(&self, tolerance: f32) -> Outline {
        let tolerance = tolerance.max(0.01);
        let mut polygons = Vec::new();
        let mut current: Vec<Point> = Vec::new();
        let mut start = Point::ZERO;
        let mut last = Point::ZERO;

        let mut finish = |points: &mut Vec<Point>, closed: bool| {
            if points.len() > 1 {
                polygons.push(Polygon {
                    points: std::mem::take(points),
                    closed,
                });
            } else {
                points.clear();
            }
        };

        for el in &self.elements {
            match *el {
                PathEl::MoveTo(p) => {
                    finish(&mut current, false);
                    current.push(p);
                    start = p;
                    last = p;
                }
                PathEl::LineTo(p) => {
                    if current.is_empty() {
                        current.push(last);
                    }
                    current.push(p);
                    last = p;
                }
                PathEl::QuadTo(c, p) => {
                    if current.is_empty() {
                        current.push(last);
                    }
                    let dd = (last - c * 2.0 + p).distance(Point::ZERO);
                    let n = ((dd / (8.0 * tolerance)).sqrt().ceil() as usize).clamp(1, 64);
                    for i in 1..=n {
                        let t = i as f32 / n as f32;
                        let mt = 1.0 - t;
                        current.push(last * (mt * mt) + c * (2.0 * mt * t) + p * (t * t));
                    }
                    last = p;
                }
                PathEl::CubicTo(c1, c2, p) => {
                    if current.is_empty() {
                        current.push(last);
                    }
                    let d1 = (last - c1 * 2.0 + c2).distance(Point::ZERO);
                    let d2 = (c1 - c2 * 2.0 + p).distance(Point::ZERO);
                    let dd = d1.max(d2) * 0.75;
                    let n = ((dd / tolerance).sqrt().ceil() as usize).clamp(1, 64);
                    for i in 1..=n {
                        let t = i as f32 / n as f32;
                        let mt = 1.0 - t;
                        current.push(
                            last * (mt * mt * mt)
                                + c1 * (3.0 * mt * mt * t)
                                + c2 * (3.0 * mt * t * t)
                                + p * (t * t * t),
                        );
                    }
                    last = p;
                }
                PathEl::Close => {
                    finish(&mut current, true);
                    last = start;
                }
            }
        }
        finish(&mut current, false);

        Outline { polygons }
    }
}

/// A flattened subpath.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl Polygon {
    fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        let count = if self.closed { n } else { n.saturating_sub(1) };
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Outline segments with the arc length at which each one starts.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point, f32)> + '_ {
        self.edges().scan(0.0f32, |travelled, (a, b)| {
            let start = *travelled;
            *travelled += a.distance(b);
            Some((a, b, start))
        })
    }

    /// Signed winding contribution of this polygon around `p`.
    ///
    /// Open subpaths are implicitly closed for filling, as canvas fill does.
    fn winding(&self, p: Point) -> i32 {
        let n = self.points.len();
        let mut wn = 0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let is_left = (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y);
            if a.y <= p.y {
                if b.y > p.y && is_left > 0.0 {
                    wn += 1;
                }
            } else if b.y <= p.y && is_left < 0.0 {
                wn -= 1;
            }
        }
        wn
    }

    /// Nonzero-winding containment test.
    pub fn contains(&self, p: Point) -> bool {
        self.winding(p) != 0
    }
}

/// A flattened path: one polygon per subpath.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outline {
    pub polygons: Vec<Polygon>,
}

impl Outline {
    /// Nonzero-winding fill test across all subpaths.
    pub fn contains(&self, p: Point) -> bool {
        self.polygons.iter().map(|poly| poly.winding(p)).sum::<i32>() != 0
    }

    /// Axis-aligned bounds of every vertex.
    pub fn bounds(&self) -> Rect {
        let mut points = self.polygons.iter().flat_map(|p| p.points.iter());
        let first = match points.next() {
            Some(p) => *p,
            None => return Rect::ZERO,
        };
        let (mut min, mut max) = (first, first);
        for p in points {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}
