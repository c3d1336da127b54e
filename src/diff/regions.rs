use serde::{Deserialize, Serialize};

use crate::diff::bitmap::Bitmap;
use crate::diff::ssim::SimilarityMap;

/// Divergence at or above this value (0-255 scale) marks a pixel as changed.
pub const CHANGE_THRESHOLD: u8 = 30;

/// Outline colour for changed regions (red).
pub const HIGHLIGHT: [u8; 3] = [255, 0, 0];

/// Outline thickness in pixels.
pub const OUTLINE_WIDTH: u32 = 2;

/// Axis-aligned bounding box of one changed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// `round((1 - s) * 255)` per pixel, clamped to the byte range.
pub fn divergence(map: &SimilarityMap) -> Vec<u8> {
    map.values
        .iter()
        .map(|&s| ((1.0 - s as f64) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect()
}

pub fn binarize(divergence: &[u8]) -> Vec<bool> {
    divergence.iter().map(|&d| d >= CHANGE_THRESHOLD).collect()
}

/// Bounding boxes of the outermost 8-connected components of `mask`.
///
/// A component sitting in a hole of another component (unchanged pixels cut
/// off from the image border) is nested and not reported. Output order is
/// the raster order of each component's first pixel.
pub fn changed_regions(mask: &[bool], width: usize, height: usize) -> Vec<Region> {
    let outside = border_background(mask, width, height);
    let mut visited = vec![false; mask.len()];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);
        let mut exterior = false;

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            if !exterior {
                exterior = x == 0
                    || y == 0
                    || x + 1 == width
                    || y + 1 == height
                    || outside[idx - 1]
                    || outside[idx + 1]
                    || outside[idx - width]
                    || outside[idx + width];
            }

            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                        continue;
                    }
                    let n = ny as usize * width + nx as usize;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        if exterior {
            regions.push(Region {
                x: min_x as u32,
                y: min_y as u32,
                width: (max_x - min_x + 1) as u32,
                height: (max_y - min_y + 1) as u32,
            });
        }
    }

    regions
}

/// Unchanged pixels reachable from the image border through 4-connected
/// unchanged pixels. 4-connectivity is the background dual of the 8-connected
/// foreground, so a closed ring of changed pixels seals its interior.
fn border_background(mask: &[bool], width: usize, height: usize) -> Vec<bool> {
    let mut outside = vec![false; mask.len()];
    if width == 0 || height == 0 {
        return outside;
    }

    let mut stack = Vec::new();
    let border = (0..width)
        .flat_map(|x| [x, (height - 1) * width + x])
        .chain((0..height).flat_map(|y| [y * width, y * width + width - 1]));
    for idx in border {
        if !mask[idx] && !outside[idx] {
            outside[idx] = true;
            stack.push(idx);
        }
    }

    while let Some(idx) = stack.pop() {
        let (x, y) = (idx % width, idx / width);
        let neighbours = [
            (x > 0).then(|| idx - 1),
            (x + 1 < width).then(|| idx + 1),
            (y > 0).then(|| idx - width),
            (y + 1 < height).then(|| idx + width),
        ];
        for n in neighbours.into_iter().flatten() {
            if !mask[n] && !outside[n] {
                outside[n] = true;
                stack.push(n);
            }
        }
    }

    outside
}

/// Draw a hollow rectangle from `(x, y)` to `(x + width, y + height)`
/// inclusive, `OUTLINE_WIDTH` pixels thick, growing inward. Clipped.
pub fn draw_outline(bitmap: &mut Bitmap, region: &Region, color: [u8; 3]) {
    let (w, h) = bitmap.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let x0 = region.x.min(w - 1);
    let y0 = region.y.min(h - 1);
    let x1 = region.right().min(w - 1);
    let y1 = region.bottom().min(h - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let on_edge = x < x0 + OUTLINE_WIDTH
                || x + OUTLINE_WIDTH > x1
                || y < y0 + OUTLINE_WIDTH
                || y + OUTLINE_WIDTH > y1;
            if on_edge {
                bitmap.set_pixel(x, y, color);
            }
        }
    }
}
