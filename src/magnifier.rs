//! Zoomed loupe shown above the corner being dragged

use serde::{Deserialize, Serialize};

use crate::quad::{Point, Rect};

/// Loupe settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MagnifierConfig {
    /// Zoom factor applied to the photo
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Side of the square viewport in pixels
    #[serde(default = "default_size")]
    pub size: f64,
    /// How far above the corner the viewport is drawn
    #[serde(default = "default_lift")]
    pub lift: f64,
}

fn default_zoom() -> f64 {
    2.5
}

fn default_size() -> f64 {
    120.0
}

fn default_lift() -> f64 {
    140.0
}

impl Default for MagnifierConfig {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            size: default_size(),
            lift: default_lift(),
        }
    }
}

/// Where to draw the loupe and which part of the photo it shows
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct MagnifierView {
    /// Viewport position relative to the interaction surface
    pub left: f64,
    pub top: f64,
    pub size: f64,
    pub background_x: f64,
    pub background_y: f64,
    pub background_width: f64,
    pub background_height: f64,
}

impl MagnifierView {
    /// CSS `background-position` / `background-size` pair
    pub fn css_background(&self) -> (String, String) {
        (
            format!("{}px {}px", self.background_x, self.background_y),
            format!("{}px {}px", self.background_width, self.background_height),
        )
    }
}

/// Center the zoomed photo on `point`
///
/// `point` is relative to the surface; `surface` and `image` are bounding
/// boxes in the same viewport coordinates.
pub fn project(
    point: Point,
    surface: Rect,
    image: Rect,
    config: &MagnifierConfig,
) -> MagnifierView {
    let half = config.size / 2.0;
    let offset_x = image.left - surface.left;
    let offset_y = image.top - surface.top;

    MagnifierView {
        left: point.x - half,
        top: point.y - config.lift,
        size: config.size,
        background_x: -((point.x - offset_x) * config.zoom) + half,
        background_y: -((point.y - offset_y) * config.zoom) + half,
        background_width: image.width * config.zoom,
        background_height: image.height * config.zoom,
    }
}
