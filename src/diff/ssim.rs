use image::GrayImage;
use image_compare::{Algorithm, SimilarityImage};

use crate::error::DiffError;

// ============================================================================
// Structural similarity (image-compare MSSIM over luminance)
// ============================================================================

/// Smallest side, in pixels, the similarity tiles can be computed over.
pub const WINDOW: usize = 8;

/// Per-pixel similarity, same grid as the inputs. 1.0 = locally identical.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMap {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl SimilarityMap {
    fn uniform(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            values: vec![value; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SsimOutput {
    /// Mean similarity in [0.0, 1.0]
    pub score: f64,
    pub map: SimilarityMap,
}

/// Mean structural similarity of two luminance images plus its per-pixel map.
///
/// Identical grids short-circuit to exactly 1.0.
pub fn structural_similarity(a: &GrayImage, b: &GrayImage) -> Result<SsimOutput, DiffError> {
    if a.dimensions() != b.dimensions() {
        return Err(DiffError::DimensionMismatch {
            baseline: a.dimensions(),
            current: b.dimensions(),
        });
    }

    let (width, height) = a.dimensions();
    if (width as usize) < WINDOW || (height as usize) < WINDOW {
        return Err(DiffError::TooSmall {
            width,
            height,
            window: WINDOW as u32,
        });
    }

    if a.as_raw() == b.as_raw() {
        return Ok(SsimOutput {
            score: 1.0,
            map: SimilarityMap::uniform(width as usize, height as usize, 1.0),
        });
    }

    let similarity = image_compare::gray_similarity_structure(&Algorithm::MSSIMSimple, a, b)
        .map_err(|e| DiffError::Similarity(e.to_string()))?;

    let map = match similarity.image {
        SimilarityImage::Gray(map) => map,
        _ => {
            return Err(DiffError::Similarity(
                "expected a single-channel similarity map".into(),
            ));
        }
    };

    Ok(SsimOutput {
        score: similarity.score.clamp(0.0, 1.0),
        map: SimilarityMap {
            width: width as usize,
            height: height as usize,
            values: map.into_raw(),
        },
    })
}
