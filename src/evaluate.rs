//! Evaluation pipeline: load a dataset, run segmentation scoring and ground
//! error analysis, report and write outputs.
//!
//! Both evaluations finish before anything is written, so a fatal error
//! never leaves partial output behind.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::config::{
    EvaluationConfig, AVERAGES_FILE, CENTRES_FILE, ERROR_MAP_FILE, ESTIMATE_FILE, LANDSCAPE_FILE,
    WATERSHED_FILE,
};
use crate::error::{EvalError, Result};
use crate::geometry::BoundingBox;
use crate::ground::{evaluate_ground, GroundReport};
use crate::io::{load_label_raster, load_raster, write_averages, write_color_raster};
use crate::matching::{match_and_score, MatchReport};
use crate::raster::{LabelRaster, Raster};
use crate::regions::{
    check_tree_width, extract_estimated_regions, extract_tree_masks, extract_true_regions,
};

/// A statistic that was either computed or had nothing to aggregate.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Measured(T),
    /// Names the empty input, e.g. "estimated regions".
    Degenerate(&'static str),
}

impl<T> Outcome<T> {
    pub fn measured(&self) -> Option<&T> {
        match self {
            Outcome::Measured(v) => Some(v),
            Outcome::Degenerate(_) => None,
        }
    }
}

/// Turn a degenerate-statistics error into a sentinel; keep fatal errors.
fn outcome<T>(result: Result<T>) -> Result<Outcome<T>> {
    match result {
        Ok(v) => Ok(Outcome::Measured(v)),
        Err(EvalError::DegenerateStatistics { quantity }) => Ok(Outcome::Degenerate(quantity)),
        Err(e) => Err(e),
    }
}

/// Rasters of one dataset. Only those needed by the enabled evaluations
/// are present.
#[derive(Debug, Clone)]
pub struct DatasetRasters {
    pub centres: Raster,
    pub watershed: Option<LabelRaster>,
    pub landscape: Option<Raster>,
    pub estimate: Option<Raster>,
}

impl DatasetRasters {
    /// Load the rasters `config` asks for.
    pub fn load(config: &EvaluationConfig) -> Result<Self> {
        let centres = load_raster(&config.input(CENTRES_FILE))?;
        let watershed = if config.segmentation {
            Some(load_label_raster(&config.input(WATERSHED_FILE))?)
        } else {
            None
        };
        let (landscape, estimate) = if config.ground {
            (
                Some(load_raster(&config.input(LANDSCAPE_FILE))?),
                Some(load_raster(&config.input(ESTIMATE_FILE))?),
            )
        } else {
            (None, None)
        };
        info!(
            "loaded '{}' ({} × {})",
            config.dataset_dir.display(),
            centres.ncol,
            centres.nrow
        );
        Ok(Self {
            centres,
            watershed,
            landscape,
            estimate,
        })
    }
}

/// Tree segmentation quality.
#[derive(Debug, Clone)]
pub struct SegmentationReport {
    pub count_found: usize,
    pub count_true: usize,
    pub matching: Outcome<MatchReport>,
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub dataset: String,
    pub tree_width: i32,
    /// `None` when the evaluation was not requested.
    pub segmentation: Option<SegmentationReport>,
    pub ground: Option<Outcome<GroundReport>>,
}

fn evaluate_segmentation(
    centres: &Raster,
    watershed: &LabelRaster,
    tree_width: i32,
) -> Result<SegmentationReport> {
    centres.ensure_same_dims(CENTRES_FILE, watershed, WATERSHED_FILE)?;
    let truth = extract_true_regions(centres, tree_width)?;
    let estimated: Vec<BoundingBox> = extract_estimated_regions(watershed)
        .iter()
        .map(|r| r.bounding_box())
        .collect();
    info!(
        "segmentation: {} estimated vs {} true crowns",
        estimated.len(),
        truth.len()
    );
    Ok(SegmentationReport {
        count_found: estimated.len(),
        count_true: truth.len(),
        matching: outcome(match_and_score(&truth, &estimated))?,
    })
}

fn evaluate_ground_error(
    centres: &Raster,
    landscape: &Raster,
    estimate: &Raster,
    tree_width: i32,
) -> Result<Outcome<GroundReport>> {
    centres.ensure_same_dims(CENTRES_FILE, landscape, LANDSCAPE_FILE)?;
    landscape.ensure_same_dims(LANDSCAPE_FILE, estimate, ESTIMATE_FILE)?;
    let masks = extract_tree_masks(centres, tree_width)?;
    info!("ground: {} tree masks", masks.len());
    outcome(evaluate_ground(&masks, landscape, estimate))
}

/// Run the enabled evaluations on already loaded rasters.
pub fn evaluate_rasters(
    dataset: &str,
    rasters: &DatasetRasters,
    tree_width: i32,
) -> Result<EvaluationReport> {
    check_tree_width(tree_width)?;

    let ground = match (&rasters.landscape, &rasters.estimate) {
        (Some(landscape), Some(estimate)) => Some(evaluate_ground_error(
            &rasters.centres,
            landscape,
            estimate,
            tree_width,
        )?),
        _ => None,
    };

    let segmentation = match &rasters.watershed {
        Some(watershed) => Some(evaluate_segmentation(
            &rasters.centres,
            watershed,
            tree_width,
        )?),
        None => None,
    };

    Ok(EvaluationReport {
        dataset: dataset.to_string(),
        tree_width,
        segmentation,
        ground,
    })
}

/// Validate `config`, load its dataset and evaluate it. Writes nothing.
pub fn run(config: &EvaluationConfig) -> Result<EvaluationReport> {
    config.validate()?;
    let rasters = DatasetRasters::load(config)?;
    evaluate_rasters(&config.dataset_name(), &rasters, config.tree_width)
}

/// Write the error map and averages file for a measured ground evaluation.
///
/// Returns the paths written.
pub fn write_outputs(report: &EvaluationReport, config: &EvaluationConfig) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let ground = match &report.ground {
        Some(Outcome::Measured(g)) => g,
        Some(Outcome::Degenerate(quantity)) => {
            warn!("no ground outputs written: no {}", quantity);
            return Ok(written);
        }
        None => return Ok(written),
    };

    fs::create_dir_all(&config.output_dir)?;
    let map_path = config.output_dir.join(ERROR_MAP_FILE);
    write_color_raster(&ground.error_map, &map_path)?;
    written.push(map_path);

    let averages_path = config.output_dir.join(AVERAGES_FILE);
    write_averages(ground, &averages_path)?;
    written.push(averages_path);

    for p in &written {
        info!("wrote {}", p.display());
    }
    Ok(written)
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "'{}' DEM evaluation:", self.dataset)?;
        match &self.ground {
            Some(Outcome::Measured(g)) => {
                writeln!(
                    f,
                    "ground Avg diff: {:.4} stdDev: {:.4}",
                    g.diff.mean, g.diff.std_dev
                )?;
                let (low, medium, high) = g.class_counts();
                writeln!(
                    f,
                    "ground error classes: low {} medium {} high {}",
                    low, medium, high
                )?;
            }
            Some(Outcome::Degenerate(quantity)) => {
                writeln!(f, "ground Avg diff: n/a (no {})", quantity)?;
            }
            None => {}
        }
        if let Some(s) = &self.segmentation {
            writeln!(
                f,
                "No. of trees found: {} True no. of trees: {}",
                s.count_found, s.count_true
            )?;
            match &s.matching {
                Outcome::Measured(m) => {
                    writeln!(f, "mean IOU: {:.4} stdDev: {:.4}", m.iou.mean, m.iou.std_dev)?
                }
                Outcome::Degenerate("estimated regions") => {
                    writeln!(f, "mean IOU: n/a (no trees detected)")?
                }
                Outcome::Degenerate(quantity) => writeln!(f, "mean IOU: n/a (no {})", quantity)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Pixel;
    use crate::ground::ErrorClass;
    use crate::raster::BACKGROUND;

    fn dataset(n: usize, centres_at: &[Pixel]) -> DatasetRasters {
        let mut centres = Raster::new(n, n, 0.0);
        for p in centres_at {
            centres[(p.y as usize, p.x as usize)] = 1.0;
        }
        DatasetRasters {
            centres,
            watershed: Some(LabelRaster::new(n, n, BACKGROUND)),
            landscape: Some(Raster::new(n, n, 5.0)),
            estimate: Some(Raster::new(n, n, 5.0)),
        }
    }

    #[test]
    fn test_perfect_segmentation() {
        let mut d = dataset(60, &[Pixel::new(20, 20), Pixel::new(40, 30)]);
        let ws = d.watershed.as_mut().unwrap();
        for (i, c) in [Pixel::new(20, 20), Pixel::new(40, 30)].iter().enumerate() {
            for dy in -2..=2 {
                for dx in -2..=2 {
                    let p = c.offset(dx, dy);
                    ws[(p.y as usize, p.x as usize)] = [i as u32 + 1, 7, 7];
                }
            }
        }
        let report = evaluate_rasters("synthetic", &d, 5).unwrap();
        let seg = report.segmentation.as_ref().unwrap();
        assert_eq!(seg.count_found, 2);
        assert_eq!(seg.count_true, 2);
        let m = seg.matching.measured().unwrap();
        assert_eq!(m.iou.mean, 1.0);
        assert_eq!(m.iou.std_dev, 0.0);

        let g = report.ground.as_ref().unwrap().measured().unwrap();
        assert!(g.trees.iter().all(|t| t.class == ErrorClass::Low));
    }

    #[test]
    fn test_no_trees_detected_sentinel() {
        let d = dataset(30, &[Pixel::new(10, 10)]);
        let report = evaluate_rasters("empty", &d, 5).unwrap();
        let seg = report.segmentation.as_ref().unwrap();
        assert!(matches!(
            seg.matching,
            Outcome::Degenerate("estimated regions")
        ));
        let text = report.to_string();
        assert!(text.contains("No. of trees found: 0 True no. of trees: 1"));
        assert!(text.contains("no trees detected"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn test_no_centres_degenerate_ground() {
        let d = dataset(30, &[]);
        let report = evaluate_rasters("bare", &d, 5).unwrap();
        assert!(matches!(
            report.ground,
            Some(Outcome::Degenerate("tree masks"))
        ));
        assert!(!report.to_string().contains("NaN"));
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let mut d = dataset(30, &[Pixel::new(10, 10)]);
        d.estimate = Some(Raster::new(30, 31, 5.0));
        assert!(matches!(
            evaluate_rasters("bad", &d, 5),
            Err(EvalError::DimensionMismatch { .. })
        ));

        let mut d = dataset(30, &[Pixel::new(10, 10)]);
        d.watershed = Some(LabelRaster::new(29, 30, BACKGROUND));
        assert!(matches!(
            evaluate_rasters("bad", &d, 5),
            Err(EvalError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_tree_width() {
        let d = dataset(30, &[Pixel::new(10, 10)]);
        assert!(matches!(
            evaluate_rasters("bad", &d, 0),
            Err(EvalError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_skipped_evaluations() {
        let mut d = dataset(30, &[Pixel::new(10, 10)]);
        d.watershed = None;
        d.landscape = None;
        d.estimate = None;
        let report = evaluate_rasters("none", &d, 5).unwrap();
        assert!(report.segmentation.is_none());
        assert!(report.ground.is_none());
        assert_eq!(report.to_string(), "'none' DEM evaluation:\n");
    }
}
