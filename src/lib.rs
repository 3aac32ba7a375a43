//! wallfit - LED video wall placement and sizing
//!
//! Perspective mapping of a virtual wall onto a photo, and whole-cabinet
//! sizing with power, weight and resolution figures.

pub mod config;
pub mod error;
pub mod fitting;
pub mod interaction;
pub mod magnifier;
pub mod quad;
pub mod render;
pub mod server;
pub mod session;
pub mod transform;

pub use error::{CoreError, CoreResult};
pub use fitting::{fit, fit_by_id, recommend, CabinetModel, FitResult};
pub use interaction::QuadEditor;
pub use quad::{Corner, Point, Quad};
pub use transform::{solve_homography, to_display_matrix, DisplayMatrix, ProjectiveTransform};
