//! # dem_evaluate — accuracy of tree segmentation and ground estimation on
//! synthetic DEMs
//!
//! The synthetic datasets come with ground truth: a raster of tree centre
//! markers and the bare-earth landscape the DEM was generated from. This
//! crate scores two products derived from such a DEM:
//! - **Tree segmentation**: watershed crowns are boxed and greedily matched
//!   to the true crown boxes by IoU (`extract_true_regions`,
//!   `extract_estimated_regions`, `match_and_score`).
//! - **Ground estimation**: the estimated bare-earth raster is compared with
//!   the true landscape under each tree crown disc (`extract_tree_masks`,
//!   `evaluate_ground`), producing mean/std-dev error and a colour error map.
//!
//! Coordinates are [`Pixel`]s with `x` = column and `y` = row throughout.

pub mod config;
pub mod error;
pub mod evaluate;
pub mod geometry;
pub mod ground;
pub mod io;
pub mod matching;
pub mod raster;
pub mod regions;
pub mod stats;

pub use config::EvaluationConfig;
pub use error::{EvalError, Result};
pub use evaluate::{evaluate_rasters, run, write_outputs, DatasetRasters, EvaluationReport, Outcome};
pub use geometry::{calculate_iou, inside_circle, BoundingBox, Pixel};
pub use ground::{classify, evaluate_ground, ErrorClass, GroundReport};
pub use matching::{match_and_score, MatchReport};
pub use raster::{ColorRaster, LabelRaster, Raster};
pub use regions::{extract_estimated_regions, extract_tree_masks, extract_true_regions, Region, TreeMask};
pub use stats::{summarize, Summary};
