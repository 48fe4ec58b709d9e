//! Region extraction from the centre-marker and watershed rasters.
//!
//! - [`extract_true_regions`]: one fixed-size box per non-zero centre cell.
//! - [`extract_estimated_regions`]: group watershed cells by identical label.
//! - [`extract_tree_masks`]: one disc of pixels per non-zero centre cell.
//!
//! All scans are row-major, so the output order is deterministic.

use std::collections::HashMap;

use log::debug;

use crate::error::{EvalError, Result};
use crate::geometry::{inside_circle, BoundingBox, Pixel};
use crate::raster::{Label, LabelRaster, Raster, BACKGROUND};

/// A group of watershed cells sharing one label.
///
/// Grouping is by value equality, not connectivity: two disjoint blobs with
/// the same label form a single region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub label: Label,
    /// Member cells in discovery order.
    pub pixels: Vec<Pixel>,
    bounds: BoundingBox,
}

impl Region {
    fn new(label: Label, first: Pixel) -> Self {
        Self {
            label,
            pixels: vec![first],
            bounds: BoundingBox::new(first.x, first.y, first.x, first.y),
        }
    }

    fn push(&mut self, p: Pixel) {
        self.pixels.push(p);
        self.bounds.min_x = self.bounds.min_x.min(p.x);
        self.bounds.min_y = self.bounds.min_y.min(p.y);
        self.bounds.max_x = self.bounds.max_x.max(p.x);
        self.bounds.max_y = self.bounds.max_y.max(p.y);
    }

    /// Min/max over the member pixels.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }
}

/// Pixels assumed to be occluded by one tree crown.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeMask {
    pub center: Pixel,
    pub pixels: Vec<Pixel>,
}

/// Reject non-positive tree diameters.
pub fn check_tree_width(tree_width: i32) -> Result<()> {
    if tree_width <= 0 {
        return Err(EvalError::InvalidParameter {
            name: "tree_width",
            reason: format!("must be a positive number of pixels, got {}", tree_width),
        });
    }
    Ok(())
}

fn tree_centres(centres: &Raster) -> impl Iterator<Item = Pixel> + '_ {
    centres
        .cells()
        .filter(|(_, v)| **v != 0.0)
        .map(|(p, _)| p)
}

/// One box of half-width `tree_width / 2` (integer division) around every
/// non-zero cell of `centres`. Adjacent markers are not merged.
pub fn extract_true_regions(centres: &Raster, tree_width: i32) -> Result<Vec<BoundingBox>> {
    check_tree_width(tree_width)?;
    let half = tree_width / 2;
    let boxes: Vec<BoundingBox> = tree_centres(centres)
        .map(|c| BoundingBox::around(c, half))
        .collect();
    debug!("{} true regions (half-width {})", boxes.len(), half);
    Ok(boxes)
}

/// Group every non-background cell of `segmentation` by its label.
///
/// Regions are returned in order of first appearance.
pub fn extract_estimated_regions(segmentation: &LabelRaster) -> Vec<Region> {
    let mut index: HashMap<Label, usize> = HashMap::new();
    let mut regions: Vec<Region> = Vec::new();

    for (p, label) in segmentation.cells() {
        if *label == BACKGROUND {
            continue;
        }
        match index.get(label) {
            Some(&i) => regions[i].push(p),
            None => {
                index.insert(*label, regions.len());
                regions.push(Region::new(*label, p));
            }
        }
    }
    debug!("{} estimated regions", regions.len());
    regions
}

/// Disc offsets for a tree of diameter `tree_width`.
///
/// The local grid is `tree_width × tree_width` and the disc is centred on
/// `(r, r)` with `r = tree_width / 2`, so even widths lose their last
/// row/column of the disc.
fn disc_offsets(tree_width: i32) -> Vec<(i32, i32)> {
    let r = tree_width / 2;
    let hub = Pixel::new(r, r);
    let mut offsets = Vec::new();
    for k in 0..tree_width {
        for p in 0..tree_width {
            if inside_circle(hub, Pixel::new(k, p), r as f64) {
                offsets.push((k - r, p - r));
            }
        }
    }
    offsets
}

/// One disc-shaped mask per non-zero cell of `centres`.
///
/// Pixels falling outside the raster are dropped, so every mask contains at
/// least its centre cell.
pub fn extract_tree_masks(centres: &Raster, tree_width: i32) -> Result<Vec<TreeMask>> {
    check_tree_width(tree_width)?;
    let offsets = disc_offsets(tree_width);

    let masks: Vec<TreeMask> = tree_centres(centres)
        .map(|center| {
            let pixels: Vec<Pixel> = offsets
                .iter()
                .map(|&(dx, dy)| center.offset(dx, dy))
                .filter(|p| centres.contains(*p))
                .collect();
            if pixels.len() < offsets.len() {
                debug!(
                    "mask at ({}, {}) clipped to {} of {} pixels",
                    center.x,
                    center.y,
                    pixels.len(),
                    offsets.len()
                );
            }
            TreeMask { center, pixels }
        })
        .collect();
    Ok(masks)
}
