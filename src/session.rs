//! Live planning session
//!
//! Holds everything the user can change: target size, selected cabinet and
//! pitch, the placed quad and the photo layout. Every change recomputes the
//! derived values synchronously; the last valid transform survives a failed
//! solve.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ensure_positive, CoreError, CoreResult};
use crate::fitting::{self, CabinetModel, FitResult, Recommendation};
use crate::interaction::{CornerHandle, QuadEditor};
use crate::magnifier::{self, MagnifierConfig, MagnifierView};
use crate::quad::{Corner, Point, Quad, Rect};
use crate::transform::{solve_homography, to_display_matrix, DisplayMatrix, ProjectiveTransform};

/// Where the photo and the interaction surface sit on screen
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhotoLayout {
    /// Bounding box of the interaction surface
    pub surface: Rect,
    /// Bounding box of the displayed photo
    pub image: Rect,
}

/// Transform handed to the renderer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverlayTransform {
    pub transform: ProjectiveTransform,
    pub matrix: DisplayMatrix,
    pub css: String,
}

impl OverlayTransform {
    fn new(transform: ProjectiveTransform) -> Self {
        let matrix = to_display_matrix(&transform);
        Self {
            transform,
            css: matrix.to_css(),
            matrix,
        }
    }
}

/// Result of a pointer-move
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DragUpdate {
    pub corner: Option<Corner>,
    /// False when the new corner position could not be solved; the previous transform is kept
    pub solved: bool,
    pub overlay: Option<OverlayTransform>,
}

/// Snapshot of the whole session for the UI
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub target_width_m: f64,
    pub target_height_m: f64,
    pub cabinet_id: String,
    pub pitch_mm: f64,
    pub fit: FitResult,
    pub recommendation: Option<Recommendation>,
    pub handles: Vec<CornerHandle>,
    pub active_corner: Option<Corner>,
    pub overlay: Option<OverlayTransform>,
    pub render_mode: bool,
}

pub struct Session {
    cabinets: Vec<CabinetModel>,
    pitches: Vec<f64>,
    magnifier: MagnifierConfig,
    logical_rect: Quad,

    target_width_m: f64,
    target_height_m: f64,
    cabinet_id: String,
    pitch_mm: f64,
    /// Physical width used when simulating from the quad; follows the achieved width
    sim_width_m: f64,

    editor: QuadEditor,
    layout: Option<PhotoLayout>,
    overlay: Option<OverlayTransform>,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        let defaults = &config.defaults;
        Self {
            cabinets: config.catalog.cabinets.clone(),
            pitches: config.catalog.pitches.clone(),
            magnifier: config.magnifier,
            logical_rect: Quad::rectangle(
                config.overlay.logical_width,
                config.overlay.logical_height,
            ),
            target_width_m: defaults.target_width_m,
            target_height_m: defaults.target_height_m,
            cabinet_id: defaults.cabinet_id.clone(),
            pitch_mm: defaults.pitch_mm,
            sim_width_m: defaults.target_width_m,
            editor: QuadEditor::new(config.overlay.reset_fraction),
            layout: None,
            overlay: None,
        }
    }

    pub fn cabinets(&self) -> &[CabinetModel] {
        &self.cabinets
    }

    pub fn pitches(&self) -> &[f64] {
        &self.pitches
    }

    pub fn pitch_mm(&self) -> f64 {
        self.pitch_mm
    }

    pub fn editor(&self) -> &QuadEditor {
        &self.editor
    }

    pub fn overlay(&self) -> Option<&OverlayTransform> {
        self.overlay.as_ref()
    }

    /// Fit for the current targets and selection
    pub fn fit(&self) -> CoreResult<FitResult> {
        fitting::fit_by_id(
            self.target_width_m,
            self.target_height_m,
            &self.cabinet_id,
            self.pitch_mm,
            &self.cabinets,
        )
    }

    pub fn recommendation(&self) -> CoreResult<Option<Recommendation>> {
        fitting::recommend(self.target_width_m, self.target_height_m, &self.cabinets)
    }

    /// Change the requested wall size; an existing quad follows the new aspect ratio
    pub fn set_targets(&mut self, width_m: f64, height_m: f64) -> CoreResult<FitResult> {
        ensure_positive("target width", width_m)?;
        ensure_positive("target height", height_m)?;

        let previous = (self.target_width_m, self.target_height_m);
        self.target_width_m = width_m;
        self.target_height_m = height_m;

        let fit = match self.fit() {
            Ok(fit) => fit,
            Err(e) => {
                (self.target_width_m, self.target_height_m) = previous;
                return Err(e);
            }
        };

        info!("Target set to {}x{} m", width_m, height_m);
        self.sim_width_m = fit.actual_width_m;
        match self.editor.rescale(fit.aspect_ratio()) {
            Ok(true) => {
                self.resolve();
            }
            Ok(false) => {}
            Err(e) => warn!("Quad not rescaled: {}", e),
        }
        Ok(fit)
    }

    /// Select a cabinet and/or pitch
    pub fn select(
        &mut self,
        cabinet_id: Option<&str>,
        pitch_mm: Option<f64>,
    ) -> CoreResult<FitResult> {
        if let Some(id) = cabinet_id {
            if !self.cabinets.iter().any(|c| c.id == id) {
                return Err(CoreError::invalid(format!("unknown cabinet '{}'", id)));
            }
        }
        if let Some(pitch) = pitch_mm {
            ensure_positive("pixel pitch", pitch)?;
        }

        if let Some(id) = cabinet_id {
            self.cabinet_id = id.to_string();
        }
        if let Some(pitch) = pitch_mm {
            self.pitch_mm = pitch;
        }
        debug!("Selected cabinet {} at P{}", self.cabinet_id, self.pitch_mm);
        self.fit()
    }

    /// Record where the photo is drawn; the first layout places a quad
    pub fn set_layout(&mut self, layout: PhotoLayout) -> CoreResult<()> {
        let first = self.layout.is_none() || self.editor.quad().is_none();
        self.layout = Some(layout);
        if first {
            self.reset_quad()?;
        }
        Ok(())
    }

    /// Centered quad with the achieved aspect ratio, e.g. on photo load
    pub fn reset_quad(&mut self) -> CoreResult<bool> {
        let Some(layout) = self.layout else {
            return Ok(false);
        };
        let aspect = self.fit()?.aspect_ratio();
        let placed = self.editor.reset(aspect, layout.surface.size())?;
        if placed {
            self.resolve();
        }
        Ok(placed)
    }

    /// Place all four corners at once
    ///
    /// A degenerate quad is rejected and the current placement is kept.
    pub fn set_quad(&mut self, points: &[Point]) -> CoreResult<OverlayTransform> {
        let quad = Quad::from_slice(points)?;
        let overlay = OverlayTransform::new(solve_homography(&self.logical_rect, &quad)?);
        self.editor.set_quad(quad);
        self.overlay = Some(overlay.clone());
        Ok(overlay)
    }

    pub fn begin_drag(&mut self, corner: Corner) -> CoreResult<()> {
        self.editor.begin_drag(corner)
    }

    /// Screen-on preview; the corners stay put while it is on
    pub fn set_render_mode(&mut self, on: bool) {
        if let Some(corner) = self.editor.set_locked(on) {
            debug!("Render mode ended the drag on {}", corner.label());
        }
        info!("Render mode {}", if on { "on" } else { "off" });
    }

    pub fn render_mode(&self) -> bool {
        self.editor.is_locked()
    }

    /// Move the active corner and recompute the transform
    pub fn drag_to(&mut self, point: Point) -> DragUpdate {
        let corner = self.editor.update_drag(point);
        let solved = match corner {
            Some(_) => self.resolve(),
            None => false,
        };
        DragUpdate {
            corner,
            solved,
            overlay: self.overlay.clone(),
        }
    }

    /// Pointer-up or cancel; never fails
    pub fn end_drag(&mut self) -> Option<Corner> {
        self.editor.end_drag()
    }

    /// Recompute the overlay transform from the current quad
    ///
    /// Returns false and keeps the previous transform when the quad is degenerate.
    fn resolve(&mut self) -> bool {
        let Some(quad) = self.editor.quad() else {
            return false;
        };
        match solve_homography(&self.logical_rect, quad) {
            Ok(transform) => {
                self.overlay = Some(OverlayTransform::new(transform));
                true
            }
            Err(e) => {
                warn!("Keeping previous transform: {}", e);
                false
            }
        }
    }

    /// Fit derived from the placed quad's proportions
    pub fn simulation(&self) -> CoreResult<Option<FitResult>> {
        let Some(quad) = self.editor.quad() else {
            return Ok(None);
        };
        let cabinet = fitting::find_cabinet(&self.cabinets, &self.cabinet_id)?;
        fitting::simulate(quad, self.sim_width_m, cabinet, self.pitch_mm).map(Some)
    }

    pub fn set_sim_width(&mut self, width_m: f64) -> CoreResult<()> {
        self.sim_width_m = ensure_positive("simulated width", width_m)?;
        Ok(())
    }

    /// Loupe for the corner being dragged
    pub fn magnifier(&self) -> Option<MagnifierView> {
        let corner = self.editor.active_corner()?;
        let layout = self.layout?;
        let point = self.editor.quad()?[corner];
        Some(magnifier::project(point, layout.surface, layout.image, &self.magnifier))
    }

    pub fn view(&self) -> CoreResult<SessionView> {
        Ok(SessionView {
            target_width_m: self.target_width_m,
            target_height_m: self.target_height_m,
            cabinet_id: self.cabinet_id.clone(),
            pitch_mm: self.pitch_mm,
            fit: self.fit()?,
            recommendation: self.recommendation()?,
            handles: self.editor.corner_handles(),
            active_corner: self.editor.active_corner(),
            overlay: self.overlay.clone(),
            render_mode: self.editor.is_locked(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> PhotoLayout {
        PhotoLayout {
            surface: Rect::new(0.0, 0.0, 800.0, 600.0),
            image: Rect::new(50.0, 0.0, 700.0, 600.0),
        }
    }

    fn session_with_quad() -> Session {
        let mut session = Session::new(&Config::default());
        session.set_layout(layout()).unwrap();
        session
    }

    #[test]
    fn test_layout_places_quad_with_fit_aspect() {
        let session = session_with_quad();
        let quad = session.editor().quad().unwrap();
        // 5 m x 3 m -> aspect 5/3, base 150 px
        assert!((quad.top_edge() - 300.0).abs() < 1e-9);
        assert!((quad.left_edge() - 180.0).abs() < 1e-9);
        assert!(session.overlay().is_some());
    }

    #[test]
    fn test_no_quad_before_layout() {
        let mut session = Session::new(&Config::default());
        assert!(!session.reset_quad().unwrap());
        assert!(session.begin_drag(Corner::TopLeft).is_err());
        assert!(session.simulation().unwrap().is_none());
        assert!(session.view().unwrap().handles.is_empty());
    }

    #[test]
    fn test_drag_updates_transform() {
        let mut session = session_with_quad();
        session.begin_drag(Corner::TopRight).unwrap();
        let update = session.drag_to(Point::new(620.0, 120.0));
        assert_eq!(update.corner, Some(Corner::TopRight));
        assert!(update.solved);

        let overlay = update.overlay.unwrap();
        let mapped = overlay.transform.apply(Point::new(300.0, 0.0)).unwrap();
        assert!((mapped.x - 620.0).abs() < 1e-6);
        assert!((mapped.y - 120.0).abs() < 1e-6);
        assert!(overlay.css.starts_with("matrix3d("));
        assert!(session.magnifier().is_some());

        assert_eq!(session.end_drag(), Some(Corner::TopRight));
        assert!(session.magnifier().is_none());
    }

    #[test]
    fn test_degenerate_drag_keeps_transform_and_ends_cleanly() {
        let mut session = session_with_quad();
        let before = session.overlay().cloned();

        // drag the top-right corner onto the top-left one
        let top_left = session.editor().quad().unwrap()[Corner::TopLeft];
        session.begin_drag(Corner::TopRight).unwrap();
        let update = session.drag_to(top_left);
        assert!(!update.solved);
        assert_eq!(update.overlay, before);

        // ending the drag is unaffected by the failed solve
        assert_eq!(session.end_drag(), Some(Corner::TopRight));
        assert_eq!(session.editor().active_corner(), None);
    }

    #[test]
    fn test_set_quad() {
        let mut session = session_with_quad();
        let before = *session.editor().quad().unwrap();

        let three = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        assert!(matches!(session.set_quad(&three), Err(CoreError::InvalidInput(_))));

        let collinear = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(matches!(
            session.set_quad(&collinear),
            Err(CoreError::DegenerateConfiguration { .. })
        ));
        assert_eq!(session.editor().quad(), Some(&before));

        let square = [
            Point::new(100.0, 100.0),
            Point::new(400.0, 100.0),
            Point::new(400.0, 300.0),
            Point::new(100.0, 300.0),
        ];
        let overlay = session.set_quad(&square).unwrap();
        let mapped = overlay.transform.apply(Point::new(300.0, 200.0)).unwrap();
        assert!((mapped.x - 400.0).abs() < 1e-6);
        assert!((mapped.y - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_render_mode_locks_corners() {
        let mut session = session_with_quad();
        session.begin_drag(Corner::BottomLeft).unwrap();
        session.set_render_mode(true);
        assert!(session.render_mode());
        assert!(session.magnifier().is_none());

        assert!(session.begin_drag(Corner::TopLeft).is_err());
        assert_eq!(session.drag_to(Point::new(1.0, 1.0)).corner, None);
        assert!(session.view().unwrap().render_mode);

        session.set_render_mode(false);
        assert!(session.begin_drag(Corner::TopLeft).is_ok());
    }

    #[test]
    fn test_move_without_drag_is_ignored() {
        let mut session = session_with_quad();
        let update = session.drag_to(Point::new(1.0, 1.0));
        assert_eq!(update.corner, None);
        assert!(!update.solved);
    }

    #[test]
    fn test_set_targets_rescales_quad() {
        let mut session = session_with_quad();
        let width = session.editor().quad().unwrap().top_edge();

        let fit = session.set_targets(4.0, 4.0).unwrap();
        assert_eq!((fit.cols, fit.rows), (8, 8));
        let quad = session.editor().quad().unwrap();
        assert!((quad.top_edge() - width).abs() < 1e-9);
        assert!((quad.left_edge() - width).abs() < 1e-9);
    }

    #[test]
    fn test_set_targets_with_collapsed_quad() {
        let mut session = session_with_quad();
        let top_left = session.editor().quad().unwrap()[Corner::TopLeft];
        session.begin_drag(Corner::TopRight).unwrap();
        session.drag_to(top_left);
        session.end_drag();
        let before = *session.editor().quad().unwrap();

        let fit = session.set_targets(4.0, 4.0).unwrap();
        assert_eq!((fit.cols, fit.rows), (8, 8));
        assert_eq!(session.editor().quad(), Some(&before));
        assert_eq!(session.view().unwrap().target_width_m, 4.0);
    }

    #[test]
    fn test_invalid_targets_are_not_applied() {
        let mut session = session_with_quad();
        assert!(session.set_targets(0.0, 3.0).is_err());
        assert!(session.set_targets(5.0, -3.0).is_err());
        let view = session.view().unwrap();
        assert_eq!(view.target_width_m, 5.0);
        assert_eq!(view.target_height_m, 3.0);
    }

    #[test]
    fn test_select() {
        let mut session = Session::new(&Config::default());
        let fit = session.select(Some("500x1000"), Some(2.5)).unwrap();
        assert_eq!(fit.cabinet_id, "500x1000");
        assert_eq!(fit.resolution_width, 2000);

        assert!(session.select(Some("nope"), None).is_err());
        assert!(session.select(None, Some(0.0)).is_err());
        assert_eq!(session.pitch_mm(), 2.5);
    }

    #[test]
    fn test_simulation_follows_quad() {
        let session = session_with_quad();
        let sim = session.simulation().unwrap().unwrap();
        // quad is 300 x 180 px, sim width 5 m -> 5 m x 3 m
        assert_eq!((sim.cols, sim.rows), (10, 6));
    }

    #[test]
    fn test_view_includes_recommendation() {
        let view = session_with_quad().view().unwrap();
        assert_eq!(view.recommendation.unwrap().cabinet.id, "500x500");
        assert_eq!(view.handles.len(), 4);
        assert_eq!(view.fit.total_cabinets, 60);
    }
}
