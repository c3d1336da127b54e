#![allow(dead_code)]

use screen_watch::diff::bitmap::Bitmap;

/// Deterministic non-flat page-like bitmap: soft diagonal gradient with
/// horizontal "text line" bands every 8 rows.
pub fn textured(width: u32, height: u32) -> Bitmap {
    let mut bmp = Bitmap::filled(width, height, [255, 255, 255]);
    for y in 0..height {
        for x in 0..width {
            let base = 200 + ((x + y) % 40) as u8;
            let color = if y % 8 < 2 && x % 16 < 12 {
                [40, 40, 60]
            } else {
                [base, base, base.saturating_sub(10)]
            };
            bmp.set_pixel(x, y, color);
        }
    }
    bmp
}

/// `textured` with a solid block painted over it.
pub fn with_block(base: &Bitmap, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) -> Bitmap {
    let mut bmp = base.clone();
    bmp.fill_rect(x, y, w, h, color);
    bmp
}
