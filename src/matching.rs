//! Segmentation scoring: greedy best-overlap matching of estimated crowns
//! against true crowns.
//!
//! Each estimated box is scored against the single true box it overlaps
//! most. True boxes are not consumed, so several estimated boxes may share
//! the same best match (many-to-one).

use log::{debug, warn};

use crate::error::{EvalError, Result};
use crate::geometry::{calculate_iou, BoundingBox};
use crate::stats::{summarize, Summary};

/// Result of [`match_and_score`].
#[derive(Debug, Clone)]
pub struct MatchReport {
    /// Best IoU per estimated region, in input order.
    pub scores: Vec<f64>,
    /// 0-based index of the best true region per estimated region, `None`
    /// when no true region overlaps it at all.
    pub best_true: Vec<Option<usize>>,
    /// Mean / population std-dev of `scores`.
    pub iou: Summary,
    /// Number of estimated regions.
    pub count_found: usize,
    /// Number of true regions.
    pub count_true: usize,
}

/// Best IoU of `estimated` against any of `truth`, with its index.
///
/// Returns `(0.0, None)` when `truth` is empty or nothing overlaps. Ties keep
/// the first true region in input order.
pub fn best_overlap(estimated: &BoundingBox, truth: &[BoundingBox]) -> (f64, Option<usize>) {
    let mut best = 0.0_f64;
    let mut best_idx = None;
    for (j, t) in truth.iter().enumerate() {
        let iou = calculate_iou(t, estimated);
        if iou > best {
            best = iou;
            best_idx = Some(j);
        }
    }
    (best, best_idx)
}

/// Score every estimated region against its best-overlapping true region.
///
/// Fails with [`EvalError::DegenerateStatistics`] when either input is empty,
/// since the mean IoU is meaningless without something to compare.
pub fn match_and_score(truth: &[BoundingBox], estimated: &[BoundingBox]) -> Result<MatchReport> {
    if estimated.is_empty() {
        warn!("no estimated regions: segmentation statistics unavailable");
        return Err(EvalError::DegenerateStatistics {
            quantity: "estimated regions",
        });
    }
    if truth.is_empty() {
        warn!("no true regions: segmentation statistics unavailable");
        return Err(EvalError::DegenerateStatistics {
            quantity: "true regions",
        });
    }

    let (scores, best_true): (Vec<f64>, Vec<Option<usize>>) = estimated
        .iter()
        .map(|e| best_overlap(e, truth))
        .unzip();

    let iou = summarize(&scores, "estimated regions")?;
    debug!(
        "matched {} estimated against {} true regions: mean IoU {:.4}",
        estimated.len(),
        truth.len(),
        iou.mean
    );

    Ok(MatchReport {
        scores,
        best_true,
        iou,
        count_found: estimated.len(),
        count_true: truth.len(),
    })
}
