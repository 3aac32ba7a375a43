//! Display sizing: whole-cabinet grids, power, weight and resolution
//!
//! Target sizes are in meters, cabinet dimensions and pixel pitch in
//! millimeters. Everything here is a pure function of its inputs and cheap
//! enough to run on every keystroke.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ensure_positive, CoreError, CoreResult};
use crate::quad::Quad;

/// Pitch used to rank cabinets against each other
pub const REFERENCE_PITCH_MM: f64 = 3.91;

/// Viewing distance (m) per millimeter of pitch
const VIEW_DISTANCE_PER_MM: f64 = 1.5;

/// A modular LED cabinet from the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CabinetModel {
    pub id: String,
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub weight_kg: f64,
    pub max_power_w: f64,
    pub avg_power_w: f64,
}

impl CabinetModel {
    pub fn new(
        id: &str,
        name: &str,
        width_mm: f64,
        height_mm: f64,
        weight_kg: f64,
        max_power_w: f64,
        avg_power_w: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            width_mm,
            height_mm,
            weight_kg,
            max_power_w,
            avg_power_w,
        }
    }

    /// Check the dimensions the grid computation divides by
    pub fn validate(&self) -> CoreResult<()> {
        ensure_positive("cabinet width", self.width_mm)?;
        ensure_positive("cabinet height", self.height_mm)?;
        Ok(())
    }
}

/// Achieved wall for a target size, snapped to whole cabinets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitResult {
    pub cabinet_id: String,
    pub cols: u32,
    pub rows: u32,
    /// Achieved width in meters
    pub actual_width_m: f64,
    /// Achieved height in meters
    pub actual_height_m: f64,
    pub resolution_width: u32,
    pub resolution_height: u32,
    pub total_cabinets: u32,
    pub total_weight_kg: f64,
    pub total_max_power_kw: f64,
    pub total_avg_power_kw: f64,
    pub total_area_m2: f64,
    pub total_pixels: u64,
}

impl FitResult {
    /// Width over height of the achieved wall
    pub fn aspect_ratio(&self) -> f64 {
        self.actual_width_m / self.actual_height_m
    }
}

/// Fit a wall of `cabinet` units to the target size
pub fn fit(
    target_width_m: f64,
    target_height_m: f64,
    cabinet: &CabinetModel,
    pitch_mm: f64,
) -> CoreResult<FitResult> {
    ensure_positive("target width", target_width_m)?;
    ensure_positive("target height", target_height_m)?;
    ensure_positive("pixel pitch", pitch_mm)?;
    cabinet.validate()?;

    let cols = checked_count(
        "cabinet columns",
        (target_width_m * 1000.0 / cabinet.width_mm).round(),
    )?
    .max(1);
    let rows = checked_count(
        "cabinet rows",
        (target_height_m * 1000.0 / cabinet.height_mm).round(),
    )?
    .max(1);

    let actual_width_m = cols as f64 * cabinet.width_mm / 1000.0;
    let actual_height_m = rows as f64 * cabinet.height_mm / 1000.0;

    let resolution_width =
        checked_count("horizontal resolution", (actual_width_m * 1000.0 / pitch_mm).round())?;
    let resolution_height =
        checked_count("vertical resolution", (actual_height_m * 1000.0 / pitch_mm).round())?;

    let total_cabinets = cols
        .checked_mul(rows)
        .ok_or_else(|| CoreError::invalid(format!("{}x{} cabinets is too many", cols, rows)))?;
    let count = total_cabinets as f64;

    Ok(FitResult {
        cabinet_id: cabinet.id.clone(),
        cols,
        rows,
        actual_width_m,
        actual_height_m,
        resolution_width,
        resolution_height,
        total_cabinets,
        total_weight_kg: count * cabinet.weight_kg,
        total_max_power_kw: count * cabinet.max_power_w / 1000.0,
        total_avg_power_kw: count * cabinet.avg_power_w / 1000.0,
        total_area_m2: actual_width_m * actual_height_m,
        total_pixels: resolution_width as u64 * resolution_height as u64,
    })
}

/// Convert a rounded count, rejecting anything a `u32` cannot hold
fn checked_count(name: &str, value: f64) -> CoreResult<u32> {
    if value.is_finite() && value <= u32::MAX as f64 {
        Ok(value as u32)
    } else {
        Err(CoreError::invalid(format!("{} out of range: {}", name, value)))
    }
}

/// Look up a cabinet by id, falling back to the first catalog entry
pub fn find_cabinet<'a>(catalog: &'a [CabinetModel], id: &str) -> CoreResult<&'a CabinetModel> {
    if let Some(cabinet) = catalog.iter().find(|c| c.id == id) {
        return Ok(cabinet);
    }
    let first = catalog
        .first()
        .ok_or_else(|| CoreError::invalid("cabinet catalog is empty"))?;
    warn!("Unknown cabinet '{}', using '{}'", id, first.id);
    Ok(first)
}

/// [`fit`] with the cabinet referenced by catalog id
pub fn fit_by_id(
    target_width_m: f64,
    target_height_m: f64,
    cabinet_id: &str,
    pitch_mm: f64,
    catalog: &[CabinetModel],
) -> CoreResult<FitResult> {
    let cabinet = find_cabinet(catalog, cabinet_id)?;
    fit(target_width_m, target_height_m, cabinet, pitch_mm)
}

/// Best-fit cabinet for a target size
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub cabinet: CabinetModel,
    pub fit: FitResult,
    /// L1 distance between requested and achieved size, in meters
    pub deviation_m: f64,
}

/// Pick the cabinet whose whole-number tiling lands closest to the target
///
/// Ties keep the earlier catalog entry. Returns `None` for an empty catalog.
pub fn recommend(
    target_width_m: f64,
    target_height_m: f64,
    catalog: &[CabinetModel],
) -> CoreResult<Option<Recommendation>> {
    ensure_positive("target width", target_width_m)?;
    ensure_positive("target height", target_height_m)?;

    let mut best: Option<Recommendation> = None;
    for cabinet in catalog {
        let result = fit(target_width_m, target_height_m, cabinet, REFERENCE_PITCH_MM)?;
        let deviation_m = (target_width_m - result.actual_width_m).abs()
            + (target_height_m - result.actual_height_m).abs();

        if best.as_ref().map_or(true, |b| deviation_m < b.deviation_m) {
            best = Some(Recommendation {
                cabinet: cabinet.clone(),
                fit: result,
                deviation_m,
            });
        }
    }

    if let Some(b) = &best {
        debug!(
            "Best fit for {}x{} m: {} (deviation {:.3} m)",
            target_width_m, target_height_m, b.cabinet.id, b.deviation_m
        );
    }
    Ok(best)
}

/// Fit the wall the placed quad suggests: its pixel aspect ratio applied to a physical width
pub fn simulate(
    quad: &Quad,
    width_m: f64,
    cabinet: &CabinetModel,
    pitch_mm: f64,
) -> CoreResult<FitResult> {
    ensure_positive("simulated width", width_m)?;

    let px_width = quad.top_edge();
    let px_height = quad.left_edge();
    if px_width.is_nan() || px_width <= 0.0 {
        return Err(CoreError::invalid("quad top edge has zero length"));
    }

    fit(width_m, width_m * px_height / px_width, cabinet, pitch_mm)
}

/// Pitch suggested for a viewing distance
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PitchSuggestion {
    pub view_distance_m: f64,
    /// Distance / 1.5, to one decimal
    pub suggested_mm: f64,
    /// Closest entry of the standard pitch list, if any
    pub nearest_standard_mm: Option<f64>,
}

pub fn suggest_pitch(
    view_distance_m: f64,
    standard_pitches: &[f64],
) -> CoreResult<PitchSuggestion> {
    ensure_positive("viewing distance", view_distance_m)?;

    let suggested_mm = (view_distance_m / VIEW_DISTANCE_PER_MM * 10.0).round() / 10.0;
    let nearest_standard_mm = standard_pitches.iter().copied().fold(None, |best: Option<f64>, p| {
        match best {
            Some(b) if (b - suggested_mm).abs() <= (p - suggested_mm).abs() => Some(b),
            _ => Some(p),
        }
    });

    Ok(PitchSuggestion {
        view_distance_m,
        suggested_mm,
        nearest_standard_mm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_cabinets;
    use crate::quad::Point;

    fn standard() -> CabinetModel {
        CabinetModel::new("500x500", "Standard 500x500", 500.0, 500.0, 7.5, 150.0, 60.0)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_reference_scenario() {
        let r = fit(5.0, 3.0, &standard(), 3.91).unwrap();
        assert_eq!(r.cols, 10);
        assert_eq!(r.rows, 6);
        assert!(approx(r.actual_width_m, 5.0));
        assert!(approx(r.actual_height_m, 3.0));
        assert_eq!(r.total_cabinets, 60);
        assert!(approx(r.total_weight_kg, 450.0));
        assert!(approx(r.total_max_power_kw, 9.0));
        assert!(approx(r.total_avg_power_kw, 3.6));
        assert_eq!(r.resolution_width, 1279);
        assert_eq!(r.resolution_height, 767);
        assert!(approx(r.total_area_m2, 15.0));
        assert_eq!(r.total_pixels, 1279 * 767);
        assert_eq!(r.cabinet_id, "500x500");
    }

    #[test]
    fn test_minimum_grid() {
        let r = fit(0.01, 0.01, &standard(), 3.91).unwrap();
        assert_eq!((r.cols, r.rows), (1, 1));
        assert!(approx(r.actual_width_m, 0.5));
        assert_eq!(r.total_cabinets, 1);
    }

    #[test]
    fn test_snaps_to_nearest_whole_cabinet() {
        // 5.2 m / 0.5 m = 10.4 -> 10, 3.3 m / 0.5 m = 6.6 -> 7
        let r = fit(5.2, 3.3, &standard(), 2.5).unwrap();
        assert_eq!((r.cols, r.rows), (10, 7));
        assert!(approx(r.actual_height_m, 3.5));
        assert_eq!(r.resolution_width, 2000);
        assert_eq!(r.resolution_height, 1400);
    }

    #[test]
    fn test_cols_monotonic_in_width() {
        let cab = standard();
        let mut last = 0;
        let mut w = 0.05;
        while w < 20.0 {
            let r = fit(w, 2.0, &cab, 3.91).unwrap();
            assert!(r.cols >= last, "cols decreased at width {}", w);
            last = r.cols;
            w += 0.037;
        }
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        let cab = standard();
        assert!(matches!(fit(0.0, 3.0, &cab, 3.91), Err(CoreError::InvalidInput(_))));
        assert!(fit(5.0, -1.0, &cab, 3.91).is_err());
        assert!(fit(5.0, 3.0, &cab, 0.0).is_err());
        assert!(fit(f64::NAN, 3.0, &cab, 3.91).is_err());

        let mut broken = standard();
        broken.width_mm = 0.0;
        assert!(fit(5.0, 3.0, &broken, 3.91).is_err());
    }

    #[test]
    fn test_large_targets() {
        let cab = standard();

        // a stadium-sized wall still fits comfortably
        let r = fit(1000.0, 500.0, &cab, 3.91).unwrap();
        assert_eq!((r.cols, r.rows), (2000, 1000));
        assert_eq!(r.total_cabinets, 2_000_000);
        assert_eq!(r.resolution_width, 255_754);

        // 2e7 x 2e7 cabinets overflows the cabinet total
        assert!(matches!(
            fit(1.0e7, 1.0e7, &cab, 3.91),
            Err(CoreError::InvalidInput(_))
        ));
        // column count alone out of range
        assert!(fit(1.0e12, 1.0, &cab, 3.91).is_err());
        // resolution out of range at a microscopic pitch
        assert!(fit(5.0, 3.0, &cab, 1.0e-9).is_err());
        assert!(fit(f64::MAX, 1.0, &cab, 3.91).is_err());
        assert!(recommend(1.0e7, 1.0e7, &default_cabinets()).is_err());
    }

    #[test]
    fn test_fit_by_id_falls_back_to_first() {
        let catalog = default_cabinets();
        let r = fit_by_id(5.0, 3.0, "500x1000", 3.91, &catalog).unwrap();
        assert_eq!(r.cabinet_id, "500x1000");
        assert_eq!((r.cols, r.rows), (10, 3));

        let r = fit_by_id(5.0, 3.0, "does-not-exist", 3.91, &catalog).unwrap();
        assert_eq!(r.cabinet_id, catalog[0].id);

        assert!(fit_by_id(5.0, 3.0, "500x500", 3.91, &[]).is_err());
    }

    #[test]
    fn test_recommend_tie_keeps_catalog_order() {
        // 500x500 and 500x1000 both tile 5 m x 3 m exactly
        let catalog = default_cabinets();
        let best = recommend(5.0, 3.0, &catalog).unwrap().unwrap();
        assert_eq!(best.cabinet.id, "500x500");
        assert!(approx(best.deviation_m, 0.0));

        let mut reversed = catalog.clone();
        reversed.reverse();
        let best = recommend(5.0, 3.0, &reversed).unwrap().unwrap();
        assert_ne!(best.cabinet.id, "500x500");
        assert!(approx(best.deviation_m, 0.0));
    }

    #[test]
    fn test_recommend_prefers_closest_tiling() {
        // 1.2 m x 0.675 m is one 16:9 cabinet exactly
        let best = recommend(2.4, 1.35, &default_cabinets()).unwrap().unwrap();
        assert_eq!(best.cabinet.id, "1200x675");

        // 0.96 m square only the fixed 960 cabinet hits exactly
        let best = recommend(0.96, 0.96, &default_cabinets()).unwrap().unwrap();
        assert_eq!(best.cabinet.id, "960x960");
    }

    #[test]
    fn test_recommend_is_deterministic() {
        let catalog = default_cabinets();
        let first = recommend(7.3, 2.9, &catalog).unwrap();
        for _ in 0..10 {
            assert_eq!(recommend(7.3, 2.9, &catalog).unwrap(), first);
        }
    }

    #[test]
    fn test_recommend_empty_catalog() {
        assert_eq!(recommend(5.0, 3.0, &[]).unwrap(), None);
        assert!(recommend(0.0, 3.0, &[]).is_err());
    }

    #[test]
    fn test_simulate_uses_quad_aspect() {
        // 400 px wide, 240 px tall -> 5 m x 3 m
        let quad = Quad::centered(Point::new(500.0, 400.0), 200.0, 120.0);
        let r = simulate(&quad, 5.0, &standard(), 3.91).unwrap();
        assert_eq!((r.cols, r.rows), (10, 6));

        let collapsed = Quad::new([Point::new(1.0, 1.0); 4]);
        assert!(simulate(&collapsed, 5.0, &standard(), 3.91).is_err());
    }

    #[test]
    fn test_suggest_pitch() {
        let pitches = [1.25, 2.5, 3.91, 4.81];
        let s = suggest_pitch(5.0, &pitches).unwrap();
        assert!(approx(s.suggested_mm, 3.3));
        assert_eq!(s.nearest_standard_mm, Some(3.91));

        let s = suggest_pitch(1.0, &pitches).unwrap();
        assert!(approx(s.suggested_mm, 0.7));
        assert_eq!(s.nearest_standard_mm, Some(1.25));

        assert_eq!(suggest_pitch(3.0, &[]).unwrap().nearest_standard_mm, None);
        assert!(suggest_pitch(0.0, &pitches).is_err());
    }
}
