//! Ground estimation error under tree crowns.
//!
//! For every tree mask, the mean true terrain height and the mean estimated
//! ground height are compared. The absolute difference of the two means is
//! the per-tree error; it is aggregated over all trees and rendered into a
//! fixed-size colour map.

use log::{debug, warn};

use crate::error::{EvalError, Result};
use crate::geometry::Pixel;
use crate::raster::{ColorRaster, Raster, Rgb};
use crate::regions::TreeMask;
use crate::stats::{summarize, Summary};

/// Side length of the rendered error map (cells).
pub const ERROR_MAP_EXTENT: usize = 500;

/// Errors below this (m) are [`ErrorClass::Low`].
pub const LOW_ERROR_LIMIT: f64 = 0.5;
/// Errors below this (m) and at least [`LOW_ERROR_LIMIT`] are [`ErrorClass::Medium`].
pub const MEDIUM_ERROR_LIMIT: f64 = 2.0;

/// Severity of the ground height error under one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Low,
    Medium,
    High,
}

impl ErrorClass {
    /// Map colour: dark green, dark orange, dark red.
    pub fn color(self) -> Rgb {
        match self {
            ErrorClass::Low => [0, 100, 0],
            ErrorClass::Medium => [100, 50, 0],
            ErrorClass::High => [100, 0, 0],
        }
    }
}

/// Classify an absolute height difference. NaN falls through to `High`.
pub fn classify(abs_diff: f64) -> ErrorClass {
    if abs_diff < LOW_ERROR_LIMIT {
        ErrorClass::Low
    } else if abs_diff < MEDIUM_ERROR_LIMIT {
        ErrorClass::Medium
    } else {
        ErrorClass::High
    }
}

/// Ground comparison for one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeGroundError {
    pub center: Pixel,
    pub true_mean: f64,
    pub estimated_mean: f64,
    pub abs_diff: f64,
    pub class: ErrorClass,
}

/// Result of [`evaluate_ground`].
#[derive(Debug, Clone)]
pub struct GroundReport {
    /// One entry per tree mask, in mask order.
    pub trees: Vec<TreeGroundError>,
    /// Mean / population std-dev of the per-tree absolute differences.
    pub diff: Summary,
    /// `ERROR_MAP_EXTENT²` map, mask pixels painted with their class colour.
    pub error_map: ColorRaster,
}

impl GroundReport {
    pub fn true_means(&self) -> Vec<f64> {
        self.trees.iter().map(|t| t.true_mean).collect()
    }

    pub fn estimated_means(&self) -> Vec<f64> {
        self.trees.iter().map(|t| t.estimated_mean).collect()
    }

    /// Number of trees per class: (low, medium, high).
    pub fn class_counts(&self) -> (usize, usize, usize) {
        self.trees.iter().fold((0, 0, 0), |(l, m, h), t| match t.class {
            ErrorClass::Low => (l + 1, m, h),
            ErrorClass::Medium => (l, m + 1, h),
            ErrorClass::High => (l, m, h + 1),
        })
    }
}

/// Mean of `raster` over the in-bounds pixels of `pixels`, with the number
/// of pixels used.
fn masked_mean(raster: &Raster, pixels: &[Pixel]) -> (f64, usize) {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in pixels.iter().filter_map(|p| raster.at(*p)) {
        sum += v;
        n += 1;
    }
    if n == 0 {
        (f64::NAN, 0)
    } else {
        (sum / n as f64, n)
    }
}

/// Compare true and estimated terrain under every tree mask.
///
/// Both rasters must share an extent. Fails with
/// [`EvalError::DegenerateStatistics`] when there are no masks.
pub fn evaluate_ground(
    masks: &[TreeMask],
    true_ground: &Raster,
    estimated_ground: &Raster,
) -> Result<GroundReport> {
    true_ground.ensure_same_dims("landscape", estimated_ground, "estimate")?;
    if masks.is_empty() {
        warn!("no tree masks: ground statistics unavailable");
        return Err(EvalError::DegenerateStatistics {
            quantity: "tree masks",
        });
    }

    let mut trees = Vec::with_capacity(masks.len());
    for mask in masks {
        let (true_mean, n) = masked_mean(true_ground, &mask.pixels);
        if n == 0 {
            return Err(EvalError::InvalidParameter {
                name: "tree_masks",
                reason: format!(
                    "mask centred at ({}, {}) lies outside the {}x{} terrain raster",
                    mask.center.x, mask.center.y, true_ground.ncol, true_ground.nrow
                ),
            });
        }
        let (estimated_mean, _) = masked_mean(estimated_ground, &mask.pixels);
        let abs_diff = (true_mean - estimated_mean).abs();
        let class = classify(abs_diff);
        debug!(
            "tree ({}, {}): true {:.2} est {:.2} diff {:.2} {:?}",
            mask.center.x, mask.center.y, true_mean, estimated_mean, abs_diff, class
        );
        trees.push(TreeGroundError {
            center: mask.center,
            true_mean,
            estimated_mean,
            abs_diff,
            class,
        });
    }

    let diffs: Vec<f64> = trees.iter().map(|t| t.abs_diff).collect();
    let diff = summarize(&diffs, "tree masks")?;
    let error_map = render_error_map(masks, &trees);

    Ok(GroundReport {
        trees,
        diff,
        error_map,
    })
}

/// Paint every mask pixel with its tree's class colour. Later masks win
/// where masks overlap; pixels outside the map are skipped.
fn render_error_map(masks: &[TreeMask], trees: &[TreeGroundError]) -> ColorRaster {
    let mut map = ColorRaster::new(ERROR_MAP_EXTENT, ERROR_MAP_EXTENT, [0, 0, 0]);
    let mut skipped = 0usize;
    for (mask, tree) in masks.iter().zip(trees) {
        let color = tree.class.color();
        for p in &mask.pixels {
            if !map.set(*p, color) {
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(
            "{} mask pixels fall outside the {}x{} error map",
            skipped, ERROR_MAP_EXTENT, ERROR_MAP_EXTENT
        );
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_mask(center: Pixel, half: i32) -> TreeMask {
        let mut pixels = Vec::new();
        for dy in -half..=half {
            for dx in -half..=half {
                pixels.push(center.offset(dx, dy));
            }
        }
        TreeMask { center, pixels }
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(0.0), ErrorClass::Low);
        assert_eq!(classify(0.3), ErrorClass::Low);
        assert_eq!(classify(0.5), ErrorClass::Medium);
        assert_eq!(classify(1.0), ErrorClass::Medium);
        assert_eq!(classify(2.0), ErrorClass::High);
        assert_eq!(classify(3.0), ErrorClass::High);
    }

    #[test]
    fn test_equal_means_are_low() {
        let ground = Raster::new(20, 20, 7.25);
        let masks = vec![square_mask(Pixel::new(10, 10), 2)];
        let report = evaluate_ground(&masks, &ground, &ground).unwrap();
        assert_eq!(report.trees[0].abs_diff, 0.0);
        assert_eq!(report.trees[0].class, ErrorClass::Low);
    }

    #[test]
    fn test_classes_per_tree() {
        let truth = Raster::new(100, 100, 10.0);
        let mut estimate = Raster::new(100, 100, 10.0);
        let centres = [Pixel::new(10, 10), Pixel::new(50, 50), Pixel::new(80, 20)];
        let offsets = [0.3, 1.0, 3.0];
        let masks: Vec<TreeMask> = centres.iter().map(|c| square_mask(*c, 2)).collect();
        for (mask, off) in masks.iter().zip(offsets) {
            for p in &mask.pixels {
                estimate[(p.y as usize, p.x as usize)] = 10.0 + off;
            }
        }

        let report = evaluate_ground(&masks, &truth, &estimate).unwrap();
        let classes: Vec<ErrorClass> = report.trees.iter().map(|t| t.class).collect();
        assert_eq!(
            classes,
            vec![ErrorClass::Low, ErrorClass::Medium, ErrorClass::High]
        );
        assert_relative_eq!(report.trees[0].estimated_mean, 10.3, epsilon = 1e-9);
        assert_relative_eq!(report.trees[2].true_mean, 10.0);
        assert_eq!(report.class_counts(), (1, 1, 1));

        let mean = (0.3 + 1.0 + 3.0) / 3.0;
        assert_relative_eq!(report.diff.mean, mean, epsilon = 1e-9);
        let var = ((0.3_f64 - mean).powi(2) + (1.0 - mean).powi(2) + (3.0 - mean).powi(2)) / 3.0;
        assert_relative_eq!(report.diff.std_dev, var.sqrt(), epsilon = 1e-9);

        assert_eq!(report.error_map.dims(), (ERROR_MAP_EXTENT, ERROR_MAP_EXTENT));
        assert_eq!(report.error_map[(10, 10)], ErrorClass::Low.color());
        assert_eq!(report.error_map[(50, 50)], ErrorClass::Medium.color());
        assert_eq!(report.error_map[(20, 80)], ErrorClass::High.color());
        assert_eq!(report.error_map[(0, 0)], [0, 0, 0]);
    }

    #[test]
    fn test_mean_over_mask_only() {
        let truth = Raster::from_vec(1, 4, vec![1.0, 2.0, 3.0, 100.0]);
        let estimate = Raster::from_vec(1, 4, vec![1.0, 2.0, 3.0, -100.0]);
        let mask = TreeMask {
            center: Pixel::new(1, 0),
            pixels: vec![Pixel::new(0, 0), Pixel::new(1, 0), Pixel::new(2, 0)],
        };
        let report = evaluate_ground(&[mask], &truth, &estimate).unwrap();
        assert_relative_eq!(report.trees[0].true_mean, 2.0);
        assert_eq!(report.trees[0].abs_diff, 0.0);
        assert_eq!(report.true_means(), vec![2.0]);
        assert_eq!(report.estimated_means(), vec![2.0]);
    }

    #[test]
    fn test_no_masks_is_degenerate() {
        let g = Raster::new(10, 10, 0.0);
        let err = evaluate_ground(&[], &g, &g).unwrap_err();
        assert!(matches!(
            err,
            EvalError::DegenerateStatistics {
                quantity: "tree masks"
            }
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let truth = Raster::new(10, 10, 0.0);
        let estimate = Raster::new(10, 11, 0.0);
        let masks = vec![square_mask(Pixel::new(5, 5), 1)];
        assert!(matches!(
            evaluate_ground(&masks, &truth, &estimate),
            Err(EvalError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_map_skips_out_of_extent_pixels() {
        let truth = Raster::new(600, 600, 1.0);
        let masks = vec![square_mask(Pixel::new(550, 550), 3)];
        let report = evaluate_ground(&masks, &truth, &truth).unwrap();
        assert!(report.error_map.data.iter().all(|c| *c == [0, 0, 0]));
    }
}
