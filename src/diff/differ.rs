use crate::diff::bitmap::Bitmap;
use crate::diff::regions::{binarize, changed_regions, divergence, draw_outline, Region, HIGHLIGHT};
use crate::diff::ssim::structural_similarity;
use crate::error::DiffError;

/// Outcome of comparing a baseline against a fresh capture.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    /// 1.0 = luminance-identical
    pub score: f64,

    /// Outermost changed regions, in raster order
    pub regions: Vec<Region>,

    /// Copy of the current capture with every region outlined
    pub annotated: Bitmap,
}

impl DiffResult {
    pub fn is_identical(&self) -> bool {
        self.regions.is_empty() && self.score >= 1.0
    }
}

/// Compare `baseline` against `current`.
///
/// Fails with [`DiffError::DimensionMismatch`] when the pixel grids differ and
/// [`DiffError::TooSmall`] when either side is below the similarity window.
pub fn compare(baseline: &Bitmap, current: &Bitmap) -> Result<DiffResult, DiffError> {
    if baseline.dimensions() != current.dimensions() {
        return Err(DiffError::DimensionMismatch {
            baseline: baseline.dimensions(),
            current: current.dimensions(),
        });
    }

    let ssim = structural_similarity(&baseline.to_gray(), &current.to_gray())?;

    let mask = binarize(&divergence(&ssim.map));
    let regions = changed_regions(&mask, ssim.map.width, ssim.map.height);

    let mut annotated = current.clone();
    for region in &regions {
        draw_outline(&mut annotated, region, HIGHLIGHT);
    }

    Ok(DiffResult {
        score: ssim.score,
        regions,
        annotated,
    })
}
