//! Evaluation run configuration and dataset layout.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::regions::check_tree_width;

/// Tree centre markers (non-zero = tree).
pub const CENTRES_FILE: &str = "centres.tif";
/// Watershed segmentation, one colour per estimated crown.
pub const WATERSHED_FILE: &str = "watershed.tif";
/// True terrain elevation.
pub const LANDSCAPE_FILE: &str = "landscape.tif";
/// Estimated ground elevation.
pub const ESTIMATE_FILE: &str = "estimate.tif";

/// Error map written by a ground evaluation.
pub const ERROR_MAP_FILE: &str = "regionAvg.tif";
/// Per-tree estimated/true means written by a ground evaluation.
pub const AVERAGES_FILE: &str = "averages.txt";

pub const DEFAULT_INPUT_ROOT: &str = "input/results";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Tree diameter for the regular synthetic maps.
pub const DEFAULT_TREE_WIDTH: i32 = 30;
/// Tree diameter for the `*Small*` maps.
pub const SMALL_TREE_WIDTH: i32 = 15;

/// Synthetic maps produced by the DEM generator, grouped by terrain family.
///
/// Ground estimates for the `gentle` family are not meaningful.
pub const KNOWN_MAPS: &[&[&str]] = &[
    &["gentle", "gentleEasy", "gentleSpread", "gentleSmall", "gentleSmallEasy"],
    &["steep", "steepEasy", "steepSpread", "steepSmall", "steepSmallEasy"],
    &[
        "contourHillJoin",
        "contourHillJoinEasy",
        "contourHillJoinSpread",
        "contourHillJoinSmall",
        "contourHillJoinSmallEasy",
    ],
    &[
        "contourHillSmallSpread",
        "contourHill",
        "contourHillEasy",
        "contourHillSpread",
        "contourHillSmall",
        "contourHillSmallEasy",
    ],
    &[
        "flat",
        "flatSmallSpread",
        "flatSpreadEasy",
        "flatEasy",
        "flatSpread",
        "flatSmall",
        "flatSmallEasy",
    ],
    &["hillsSmooth", "hills", "hillsEasy", "hillsSpread", "hillsSmall", "hillsSmallEasy"],
];

/// Tree width conventionally used for a map name.
pub fn suggested_tree_width(map: &str) -> i32 {
    if map.contains("Small") {
        SMALL_TREE_WIDTH
    } else {
        DEFAULT_TREE_WIDTH
    }
}

/// Resolve a dataset argument: an existing directory or anything containing a
/// path separator is used as is, otherwise it names a map under `input_root`.
pub fn resolve_dataset(dataset: &str, input_root: &Path) -> PathBuf {
    let as_path = Path::new(dataset);
    if as_path.is_dir() || dataset.contains(std::path::MAIN_SEPARATOR) || dataset.contains('/') {
        as_path.to_path_buf()
    } else {
        input_root.join(dataset)
    }
}

/// Everything one evaluation run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    /// Directory holding the four input rasters.
    pub dataset_dir: PathBuf,
    /// Tree crown diameter in pixels.
    pub tree_width: i32,
    /// Where the error map and averages file go.
    pub output_dir: PathBuf,
    /// Score watershed crowns against true crowns.
    pub segmentation: bool,
    /// Compare estimated and true ground under crowns.
    pub ground: bool,
}

impl EvaluationConfig {
    /// Both evaluations, default output directory.
    pub fn new(dataset_dir: impl Into<PathBuf>, tree_width: i32) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            tree_width,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            segmentation: true,
            ground: true,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Reject parameters that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        check_tree_width(self.tree_width)
    }

    /// Human readable dataset name (last path component).
    pub fn dataset_name(&self) -> String {
        self.dataset_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.dataset_dir.display().to_string())
    }

    pub fn input(&self, file: &str) -> PathBuf {
        self.dataset_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    #[test]
    fn test_resolve_dataset_by_name() {
        let p = resolve_dataset("contourHillJoin", Path::new("input/results"));
        assert_eq!(p, Path::new("input/results").join("contourHillJoin"));
    }

    #[test]
    fn test_resolve_dataset_by_path() {
        let p = resolve_dataset("data/flat", Path::new("input/results"));
        assert_eq!(p, PathBuf::from("data/flat"));
    }

    #[test]
    fn test_validate_tree_width() {
        assert!(EvaluationConfig::new("x", 15).validate().is_ok());
        assert!(matches!(
            EvaluationConfig::new("x", 0).validate(),
            Err(EvalError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_dataset_name_and_inputs() {
        let cfg = EvaluationConfig::new("input/results/hillsSmall", 15).with_output_dir("out");
        assert_eq!(cfg.dataset_name(), "hillsSmall");
        assert_eq!(
            cfg.input(CENTRES_FILE),
            PathBuf::from("input/results/hillsSmall/centres.tif")
        );
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_suggested_tree_width() {
        assert_eq!(suggested_tree_width("flatSmallEasy"), 15);
        assert_eq!(suggested_tree_width("steep"), 30);
        assert!(KNOWN_MAPS.iter().flat_map(|g| g.iter()).any(|m| *m == "hillsSmooth"));
    }
}
