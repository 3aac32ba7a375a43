//! Corner dragging and quad placement
//!
//! [`QuadEditor`] is the only writer of the quad. The host event layer decides
//! when to call `begin_drag`, `update_drag` and `end_drag`; pointer-up and
//! pointer-cancel both end the session wherever the pointer is.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ensure_positive, CoreError, CoreResult};
use crate::quad::{Corner, Point, Quad, Size};

/// Drag session state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        corner: Corner,
        /// Quad as it was when the drag started
        baseline: Quad,
    },
}

/// A labeled corner handle for the UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CornerHandle {
    pub id: usize,
    pub corner: Corner,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub active: bool,
}

/// Owns the four corners and the drag session
#[derive(Debug, Clone)]
pub struct QuadEditor {
    quad: Option<Quad>,
    drag: DragState,
    reset_fraction: f64,
    /// Set while the render preview is shown; no new drags start
    locked: bool,
}

impl QuadEditor {
    pub fn new(reset_fraction: f64) -> Self {
        Self {
            quad: None,
            drag: DragState::Idle,
            reset_fraction,
            locked: false,
        }
    }

    pub fn quad(&self) -> Option<&Quad> {
        self.quad.as_ref()
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn active_corner(&self) -> Option<Corner> {
        match self.drag {
            DragState::Dragging { corner, .. } => Some(corner),
            DragState::Idle => None,
        }
    }

    /// Quad captured when the current drag started
    pub fn drag_baseline(&self) -> Option<&Quad> {
        match &self.drag {
            DragState::Dragging { baseline, .. } => Some(baseline),
            DragState::Idle => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Lock or unlock the corners; locking ends a drag in progress
    pub fn set_locked(&mut self, locked: bool) -> Option<Corner> {
        self.locked = locked;
        if locked {
            self.end_drag()
        } else {
            None
        }
    }

    /// Pointer-down on a corner handle
    pub fn begin_drag(&mut self, corner: Corner) -> CoreResult<()> {
        if self.locked {
            return Err(CoreError::invalid("corners are locked while the render preview is on"));
        }
        let quad = self
            .quad
            .ok_or_else(|| CoreError::invalid("no quad placed yet"))?;

        debug!("Drag started on {}", corner.label());
        self.drag = DragState::Dragging {
            corner,
            baseline: quad,
        };
        Ok(())
    }

    /// Pointer-move; moves only the active corner
    ///
    /// Returns the corner that moved, or `None` when no drag is active.
    pub fn update_drag(&mut self, point: Point) -> Option<Corner> {
        let DragState::Dragging { corner, .. } = self.drag else {
            return None;
        };
        let quad = self.quad.as_mut()?;
        quad[corner] = point;
        Some(corner)
    }

    /// Pointer-up; always returns to idle
    pub fn end_drag(&mut self) -> Option<Corner> {
        let ended = self.active_corner();
        self.drag = DragState::Idle;
        if let Some(corner) = ended {
            debug!("Drag ended on {}", corner.label());
        }
        ended
    }

    /// Pointer-cancel; same transition as [`QuadEditor::end_drag`]
    pub fn cancel_drag(&mut self) -> Option<Corner> {
        self.end_drag()
    }

    /// Place a centered axis-aligned rectangle with the given width/height ratio
    ///
    /// Returns `false` without touching anything when the surface is not laid out.
    pub fn reset(&mut self, aspect_ratio: f64, surface: Size) -> CoreResult<bool> {
        ensure_positive("aspect ratio", aspect_ratio)?;
        if surface.is_empty() {
            debug!("Reset skipped, surface has no size yet");
            return Ok(false);
        }

        let center = Point::new(surface.width / 2.0, surface.height / 2.0);
        let base = surface.width.min(surface.height) * self.reset_fraction;
        let (half_w, half_h) = if aspect_ratio >= 1.0 {
            (base, base / aspect_ratio)
        } else {
            (base * aspect_ratio, base)
        };

        self.quad = Some(Quad::centered(center, half_w, half_h));
        self.drag = DragState::Idle;
        Ok(true)
    }

    /// Rebuild the quad around its centroid for a new width/height ratio
    ///
    /// The top edge length is kept as the width. The result is axis-aligned:
    /// any rotation or skew of the previous quad is dropped. A collapsed top
    /// edge is rejected and the quad is left as it is.
    pub fn rescale(&mut self, aspect_ratio: f64) -> CoreResult<bool> {
        ensure_positive("aspect ratio", aspect_ratio)?;
        let Some(quad) = self.quad.as_mut() else {
            return Ok(false);
        };

        let width = ensure_positive("quad top edge", quad.top_edge())?;
        let height = width / aspect_ratio;
        *quad = Quad::centered(quad.centroid(), width / 2.0, height / 2.0);
        Ok(true)
    }

    /// Replace the whole quad, e.g. when restoring a saved placement
    pub fn set_quad(&mut self, quad: Quad) {
        self.quad = Some(quad);
        self.drag = DragState::Idle;
    }

    /// Labeled handles for all four corners
    pub fn corner_handles(&self) -> Vec<CornerHandle> {
        let Some(quad) = &self.quad else {
            return Vec::new();
        };
        let active = self.active_corner();

        Corner::ALL
            .iter()
            .map(|&corner| CornerHandle {
                id: corner.index(),
                corner,
                label: corner.label().to_string(),
                x: quad[corner].x,
                y: quad[corner].y,
                active: active == Some(corner),
            })
            .collect()
    }
}

impl Default for QuadEditor {
    fn default() -> Self {
        Self::new(0.25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed() -> QuadEditor {
        let mut editor = QuadEditor::default();
        assert!(editor.reset(1.0, Size::new(800.0, 600.0)).unwrap());
        editor
    }

    #[test]
    fn test_reset_wide() {
        let mut editor = QuadEditor::default();
        editor.reset(2.0, Size::new(800.0, 600.0)).unwrap();
        let q = editor.quad().unwrap();
        // base = 600 * 0.25 = 150, half height = 75
        assert_eq!(q[Corner::TopLeft], Point::new(250.0, 225.0));
        assert_eq!(q[Corner::BottomRight], Point::new(550.0, 375.0));
    }

    #[test]
    fn test_reset_tall() {
        let mut editor = QuadEditor::default();
        editor.reset(0.5, Size::new(800.0, 600.0)).unwrap();
        let q = editor.quad().unwrap();
        assert_eq!(q[Corner::TopLeft], Point::new(325.0, 150.0));
        assert_eq!(q[Corner::BottomRight], Point::new(475.0, 450.0));
    }

    #[test]
    fn test_reset_without_layout_is_noop() {
        let mut editor = QuadEditor::default();
        assert!(!editor.reset(1.0, Size::new(0.0, 0.0)).unwrap());
        assert!(editor.quad().is_none());

        let mut editor = placed();
        let before = *editor.quad().unwrap();
        assert!(!editor.reset(2.0, Size::new(800.0, 0.0)).unwrap());
        assert_eq!(editor.quad(), Some(&before));
    }

    #[test]
    fn test_reset_rejects_bad_aspect() {
        let mut editor = QuadEditor::default();
        assert!(editor.reset(0.0, Size::new(800.0, 600.0)).is_err());
        assert!(editor.reset(f64::INFINITY, Size::new(800.0, 600.0)).is_err());
        assert!(editor.quad().is_none());
    }

    #[test]
    fn test_drag_moves_only_active_corner() {
        let mut editor = placed();
        let before = *editor.quad().unwrap();

        editor.begin_drag(Corner::BottomRight).unwrap();
        assert_eq!(editor.active_corner(), Some(Corner::BottomRight));
        assert_eq!(editor.drag_baseline(), Some(&before));

        assert_eq!(editor.update_drag(Point::new(700.0, 520.0)), Some(Corner::BottomRight));
        assert_eq!(editor.update_drag(Point::new(710.0, 530.0)), Some(Corner::BottomRight));

        let q = editor.quad().unwrap();
        assert_eq!(q[Corner::BottomRight], Point::new(710.0, 530.0));
        for corner in [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft] {
            assert_eq!(q[corner], before[corner]);
        }
        // baseline is not touched by moves
        assert_eq!(editor.drag_baseline(), Some(&before));
    }

    #[test]
    fn test_end_drag_always_idles() {
        let mut editor = placed();
        assert_eq!(editor.end_drag(), None);

        editor.begin_drag(Corner::TopLeft).unwrap();
        assert_eq!(editor.end_drag(), Some(Corner::TopLeft));
        assert_eq!(editor.drag_state(), &DragState::Idle);

        // moves after the session ended are ignored
        let before = *editor.quad().unwrap();
        assert_eq!(editor.update_drag(Point::new(1.0, 1.0)), None);
        assert_eq!(editor.quad(), Some(&before));

        editor.begin_drag(Corner::TopRight).unwrap();
        assert_eq!(editor.cancel_drag(), Some(Corner::TopRight));
        assert_eq!(editor.active_corner(), None);
    }

    #[test]
    fn test_begin_drag_requires_quad() {
        let mut editor = QuadEditor::default();
        assert!(matches!(
            editor.begin_drag(Corner::TopLeft),
            Err(CoreError::InvalidInput(_))
        ));
        assert_eq!(editor.drag_state(), &DragState::Idle);
    }

    #[test]
    fn test_locked_editor_refuses_drags() {
        let mut editor = placed();
        editor.begin_drag(Corner::TopLeft).unwrap();
        assert_eq!(editor.set_locked(true), Some(Corner::TopLeft));
        assert!(editor.is_locked());

        let before = *editor.quad().unwrap();
        assert!(matches!(
            editor.begin_drag(Corner::BottomRight),
            Err(CoreError::InvalidInput(_))
        ));
        assert_eq!(editor.update_drag(Point::new(5.0, 5.0)), None);
        assert_eq!(editor.quad(), Some(&before));

        assert_eq!(editor.set_locked(false), None);
        assert!(editor.begin_drag(Corner::BottomRight).is_ok());
    }

    #[test]
    fn test_rescale_keeps_width_and_center() {
        let mut editor = placed();
        editor.begin_drag(Corner::TopRight).unwrap();
        editor.update_drag(Point::new(600.0, 180.0));
        editor.end_drag();

        let before = *editor.quad().unwrap();
        let width = before.top_edge();
        let center = before.centroid();

        assert!(editor.rescale(2.0).unwrap());
        let q = editor.quad().unwrap();
        assert!((q.top_edge() - width).abs() < 1e-9);
        assert!((q.left_edge() - width / 2.0).abs() < 1e-9);
        assert!((q.centroid().x - center.x).abs() < 1e-9);
        assert!((q.centroid().y - center.y).abs() < 1e-9);
        // snapped back to axis-aligned
        assert_eq!(q[Corner::TopLeft].y, q[Corner::TopRight].y);
        assert_eq!(q[Corner::TopLeft].x, q[Corner::BottomLeft].x);
    }

    #[test]
    fn test_rescale_rejects_collapsed_top_edge() {
        let mut editor = placed();
        let top_left = editor.quad().unwrap()[Corner::TopLeft];
        editor.begin_drag(Corner::TopRight).unwrap();
        editor.update_drag(top_left);
        editor.end_drag();

        let before = *editor.quad().unwrap();
        assert!(matches!(editor.rescale(2.0), Err(CoreError::InvalidInput(_))));
        assert_eq!(editor.quad(), Some(&before));
    }

    #[test]
    fn test_rescale_without_quad_is_noop() {
        let mut editor = QuadEditor::default();
        assert!(!editor.rescale(1.5).unwrap());
        assert!(editor.rescale(-1.0).is_err());
    }

    #[test]
    fn test_corner_handles() {
        let mut editor = QuadEditor::default();
        assert!(editor.corner_handles().is_empty());

        editor.reset(1.0, Size::new(400.0, 400.0)).unwrap();
        editor.begin_drag(Corner::BottomLeft).unwrap();
        let handles = editor.corner_handles();
        assert_eq!(handles.len(), 4);
        assert_eq!(handles[0].label, "Top Left");
        assert_eq!(handles[3].corner, Corner::BottomLeft);
        assert!(handles[3].active);
        assert_eq!(handles.iter().filter(|h| h.active).count(), 1);
    }
}
