//! Perspective transformation for the wall overlay
//!
//! This module solves the homography that maps the fixed logical rectangle
//! onto the user-placed quad, and embeds it in the 4x4 matrix the rendering
//! surface applies to the overlay element.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::quad::{Point, Quad};

/// Relative pivot threshold for the elimination
const PIVOT_EPSILON: f64 = 1e-12;

/// Smallest corner sine accepted for a quad
const COLLINEAR_EPSILON: f64 = 1e-9;

/// Projective transform `(a, b, c, d, e, f, g, h)` with the ninth coefficient fixed to 1
///
/// `X = (a*x + b*y + c) / (g*x + h*y + 1)`
/// `Y = (d*x + e*y + f) / (g*x + h*y + 1)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProjectiveTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub g: f64,
    pub h: f64,
}

impl ProjectiveTransform {
    pub fn identity() -> Self {
        Self::from_coefficients([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0])
    }

    fn from_coefficients(h: [f64; 8]) -> Self {
        Self {
            a: h[0],
            b: h[1],
            c: h[2],
            d: h[3],
            e: h[4],
            f: h[5],
            g: h[6],
            h: h[7],
        }
    }

    pub fn coefficients(&self) -> [f64; 8] {
        [self.a, self.b, self.c, self.d, self.e, self.f, self.g, self.h]
    }

    /// Row-major 3x3 matrix
    pub fn matrix(&self) -> [f64; 9] {
        [self.a, self.b, self.c, self.d, self.e, self.f, self.g, self.h, 1.0]
    }

    /// Map a point; `None` when it lands on the line at infinity
    #[inline]
    pub fn apply(&self, p: Point) -> Option<Point> {
        apply_homography(&self.matrix(), p.x, p.y)
    }
}

/// Solve the transform mapping `src` corners onto `dst` corners
///
/// Uses the Direct Linear Transform for exactly 4 correspondences. Fails with
/// [`CoreError::DegenerateConfiguration`] when either quad is collapsed
/// (duplicate points, three collinear corners, zero area).
pub fn solve_homography(src: &Quad, dst: &Quad) -> CoreResult<ProjectiveTransform> {
    ensure_well_formed(src)?;
    ensure_well_formed(dst)?;

    // For each correspondence (x,y) -> (X,Y), with h9 = 1:
    // a*x + b*y + c - g*x*X - h*y*X = X
    // d*x + e*y + f - g*x*Y - h*y*Y = Y
    let mut a = [[0.0f64; 8]; 8];
    let mut b = [0.0f64; 8];

    for (i, (s, t)) in src.points().iter().zip(dst.points()).enumerate() {
        let (x, y) = (s.x, s.y);
        let (xp, yp) = (t.x, t.y);

        a[i * 2] = [x, y, 1.0, 0.0, 0.0, 0.0, -xp * x, -xp * y];
        b[i * 2] = xp;

        a[i * 2 + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -yp * x, -yp * y];
        b[i * 2 + 1] = yp;
    }

    let h = solve_linear_system(&mut a, &mut b)?;
    Ok(ProjectiveTransform::from_coefficients(h))
}

/// Reject quads with coincident corners or three corners on one line
///
/// Every 3-subset of the four corners is some corner with its two
/// neighbours, so checking the sine of each corner angle covers them all.
/// The sine does not change when the quad is moved or scaled.
fn ensure_well_formed(quad: &Quad) -> CoreResult<()> {
    let p = quad.points();
    for i in 0..4 {
        let prev = p[(i + 3) % 4];
        let next = p[(i + 1) % 4];
        let (ux, uy) = (prev.x - p[i].x, prev.y - p[i].y);
        let (vx, vy) = (next.x - p[i].x, next.y - p[i].y);

        let sine = (ux * vy - uy * vx) / (ux.hypot(uy) * vx.hypot(vy));
        if sine.is_nan() || sine.abs() <= COLLINEAR_EPSILON {
            return Err(CoreError::DegenerateConfiguration { measure: sine });
        }
    }
    Ok(())
}

/// Solve an 8x8 linear system using Gaussian elimination with partial pivoting
fn solve_linear_system(a: &mut [[f64; 8]; 8], b: &mut [f64; 8]) -> CoreResult<[f64; 8]> {
    let n = 8;

    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |m, v| m.max(v.abs()));
    if !scale.is_finite() || scale == 0.0 {
        return Err(CoreError::DegenerateConfiguration { measure: 0.0 });
    }
    let threshold = scale * PIVOT_EPSILON;

    // Forward elimination with partial pivoting
    for col in 0..n {
        // Find pivot
        let mut max_row = col;
        let mut max_val = a[col][col].abs();
        for row in (col + 1)..n {
            if a[row][col].abs() > max_val {
                max_val = a[row][col].abs();
                max_row = row;
            }
        }

        if max_row != col {
            a.swap(col, max_row);
            b.swap(col, max_row);
        }

        let pivot = a[col][col];
        if pivot.is_nan() || pivot.abs() < threshold {
            return Err(CoreError::DegenerateConfiguration { measure: pivot });
        }

        for row in (col + 1)..n {
            let factor = a[row][col] / pivot;
            a[row][col] = 0.0;
            for j in (col + 1)..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(CoreError::DegenerateConfiguration { measure: f64::NAN });
    }

    Ok(x)
}

/// Apply a homography matrix to a point
#[inline]
fn apply_homography(h: &[f64; 9], x: f64, y: f64) -> Option<Point> {
    let w = h[6] * x + h[7] * y + h[8];
    if w.abs() < 1e-12 {
        return None;
    }
    let xp = (h[0] * x + h[1] * y + h[2]) / w;
    let yp = (h[3] * x + h[4] * y + h[5]) / w;
    Some(Point::new(xp, yp))
}

/// 4x4 matrix in column-major order, as CSS `matrix3d()` expects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DisplayMatrix(pub [f64; 16]);

impl DisplayMatrix {
    /// Element at `row`, `col`
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0[col * 4 + row]
    }

    /// Apply to `(x, y, 0, 1)` and perform the perspective divide
    pub fn project(&self, p: Point) -> Option<Point> {
        let x = self.get(0, 0) * p.x + self.get(0, 1) * p.y + self.get(0, 3);
        let y = self.get(1, 0) * p.x + self.get(1, 1) * p.y + self.get(1, 3);
        let w = self.get(3, 0) * p.x + self.get(3, 1) * p.y + self.get(3, 3);
        if w.abs() < 1e-12 {
            return None;
        }
        Some(Point::new(x / w, y / w))
    }

    pub fn to_css(&self) -> String {
        let values: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        format!("matrix3d({})", values.join(","))
    }
}

/// Embed the homography in a 4x4 matrix acting on `(x, y, 0, 1)`
///
/// The divisor terms `(g, h)` land in the bottom row so the renderer's own
/// perspective divide reproduces the mapping.
pub fn to_display_matrix(t: &ProjectiveTransform) -> DisplayMatrix {
    DisplayMatrix([
        t.a, t.d, 0.0, t.g, // column 0
        t.b, t.e, 0.0, t.h, // column 1
        0.0, 0.0, 1.0, 0.0, // column 2
        t.c, t.f, 0.0, 1.0, // column 3
    ])
}
