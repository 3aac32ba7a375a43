//! Points, corners and the four-point quad
//!
//! A [`Quad`] always holds exactly four points in the winding order
//! top-left, top-right, bottom-right, bottom-left. The solver, the
//! interaction state machine and the front-end all rely on that index meaning.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use crate::error::{CoreError, CoreResult};

/// A 2D point (screen pixels for the quad, logical units for the source rectangle)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Named corner of a quad; the discriminant is the index into the point array
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft = 0,
    TopRight = 1,
    BottomRight = 2,
    BottomLeft = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Corner> {
        Corner::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Corner::TopLeft => "Top Left",
            Corner::TopRight => "Top Right",
            Corner::BottomRight => "Bottom Right",
            Corner::BottomLeft => "Bottom Left",
        }
    }
}

/// Exactly four points: top-left, top-right, bottom-right, bottom-left
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Quad([Point; 4]);

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self(points)
    }

    /// Build from a dynamically sized list, as received from a caller
    pub fn from_slice(points: &[Point]) -> CoreResult<Self> {
        let points: [Point; 4] = points.try_into().map_err(|_| {
            CoreError::invalid(format!("a quad needs exactly 4 points, got {}", points.len()))
        })?;
        Ok(Self(points))
    }

    /// Axis-aligned rectangle `[0, width] x [0, height]` with the origin top-left
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self::centered(Point::new(width / 2.0, height / 2.0), width / 2.0, height / 2.0)
    }

    /// Axis-aligned rectangle around a center point
    pub fn centered(center: Point, half_width: f64, half_height: f64) -> Self {
        let (cx, cy) = (center.x, center.y);
        Self([
            Point::new(cx - half_width, cy - half_height),
            Point::new(cx + half_width, cy - half_height),
            Point::new(cx + half_width, cy + half_height),
            Point::new(cx - half_width, cy + half_height),
        ])
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    /// Mean of the four corners
    pub fn centroid(&self) -> Point {
        let (sx, sy) = self.0.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / 4.0, sy / 4.0)
    }

    /// Length of the top edge (top-left to top-right)
    pub fn top_edge(&self) -> f64 {
        self[Corner::TopLeft].distance(&self[Corner::TopRight])
    }

    /// Length of the left edge (top-left to bottom-left)
    pub fn left_edge(&self) -> f64 {
        self[Corner::TopLeft].distance(&self[Corner::BottomLeft])
    }
}

impl Index<Corner> for Quad {
    type Output = Point;

    fn index(&self, corner: Corner) -> &Point {
        &self.0[corner.index()]
    }
}

impl IndexMut<Corner> for Quad {
    fn index_mut(&mut self, corner: Corner) -> &mut Point {
        &mut self.0[corner.index()]
    }
}

/// Width and height of the interaction surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Not laid out yet
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Bounding box in viewport coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}
