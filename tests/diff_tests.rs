use screen_watch::diff::bitmap::Bitmap;
use screen_watch::diff::differ::compare;
use screen_watch::diff::regions::{
    binarize, changed_regions, divergence, draw_outline, Region, CHANGE_THRESHOLD, HIGHLIGHT,
};
use image::Luma;
use screen_watch::diff::ssim::{structural_similarity, SimilarityMap, WINDOW};
use screen_watch::error::DiffError;

use crate::common::images::{textured, with_block};

mod common;

// ============================================================================
// Image Differ: score and regions
// ============================================================================

#[test]
fn identical_bitmaps_score_exactly_one_with_no_regions() {
    let img = textured(64, 48);
    let result = compare(&img, &img.clone()).unwrap();

    assert_eq!(result.score, 1.0);
    assert!(result.regions.is_empty());
    assert!(result.is_identical());
    assert_eq!(result.annotated, img, "nothing drawn when nothing changed");
}

#[test]
fn single_block_change_is_reported_and_overlaps_the_block() {
    let baseline = textured(64, 64);
    let current = with_block(&baseline, 20, 20, 16, 16, [0, 0, 0]);
    let changed = Region {
        x: 20,
        y: 20,
        width: 16,
        height: 16,
    };

    let result = compare(&baseline, &current).unwrap();

    assert!(result.score < 1.0, "score was {}", result.score);
    assert!(!result.regions.is_empty());
    assert!(
        result.regions.iter().any(|r| r.overlaps(&changed)),
        "no region overlaps the changed block: {:?}",
        result.regions
    );
}

#[test]
fn comparison_is_deterministic() {
    let baseline = textured(80, 60);
    let current = with_block(&baseline, 10, 30, 25, 12, [200, 30, 30]);

    let first = compare(&baseline, &current).unwrap();
    let second = compare(&baseline, &current).unwrap();

    assert_eq!(first.score.to_bits(), second.score.to_bits());
    assert_eq!(first.regions, second.regions);
    assert_eq!(
        first.annotated.encode_png().unwrap(),
        second.annotated.encode_png().unwrap()
    );
}

#[test]
fn larger_change_never_scores_higher_than_smaller_change() {
    let baseline = textured(64, 64);
    let small = with_block(&baseline, 30, 30, 4, 4, [0, 0, 0]);
    let large = with_block(&baseline, 20, 20, 24, 24, [0, 0, 0]);

    let small_score = compare(&baseline, &small).unwrap().score;
    let large_score = compare(&baseline, &large).unwrap().score;

    assert!(small_score > large_score, "{} vs {}", small_score, large_score);
}

#[test]
fn contiguous_change_collapses_to_one_box() {
    let baseline = textured(64, 64);
    let current = with_block(&baseline, 10, 10, 20, 20, [0, 0, 0]);
    let current = with_block(&current, 25, 25, 20, 20, [0, 0, 0]);

    let result = compare(&baseline, &current).unwrap();

    assert_eq!(result.regions.len(), 1, "{:?}", result.regions);
    let r = result.regions[0];
    assert!(r.x <= 10 && r.y <= 10);
    assert!(r.right() >= 45 && r.bottom() >= 45);
}

#[test]
fn distant_changes_produce_separate_boxes() {
    let baseline = textured(64, 64);
    let current = with_block(&baseline, 5, 5, 8, 8, [0, 0, 0]);
    let current = with_block(&current, 45, 45, 8, 8, [0, 0, 0]);

    let result = compare(&baseline, &current).unwrap();

    assert_eq!(result.regions.len(), 2, "{:?}", result.regions);
}

#[test]
fn annotated_copy_outlines_regions_in_highlight_colour() {
    let baseline = textured(64, 64);
    let current = with_block(&baseline, 20, 20, 16, 16, [0, 0, 0]);

    let result = compare(&baseline, &current).unwrap();
    let r = result.regions[0];

    assert_eq!(result.annotated.pixel(r.x, r.y), HIGHLIGHT);
    assert_eq!(result.annotated.pixel(r.x + 1, r.y + 1), HIGHLIGHT);
    // Untouched far corner keeps the capture's pixel
    assert_eq!(result.annotated.pixel(63, 0), current.pixel(63, 0));
}

#[test]
fn masked_region_no_longer_counts_as_change() {
    // Banner content rotates between runs; everything else is stable.
    let page = textured(64, 64);
    let baseline = with_block(&page, 0, 0, 64, 12, [250, 200, 0]);
    let current = with_block(&page, 0, 0, 64, 12, [0, 90, 250]);
    let unmasked = compare(&baseline, &current).unwrap().score;

    // With the banner hidden both captures show the page background there.
    let masked = compare(&page, &page.clone()).unwrap().score;

    assert!(masked > unmasked);
    assert_eq!(masked, 1.0);
}

// ============================================================================
// Image Differ: incomparable inputs
// ============================================================================

#[test]
fn dimension_mismatch_is_an_explicit_error() {
    let a = textured(64, 64);
    let b = textured(64, 80);

    let err = compare(&a, &b).unwrap_err();

    assert_eq!(
        err,
        DiffError::DimensionMismatch {
            baseline: (64, 64),
            current: (64, 80),
        }
    );
}

#[test]
fn bitmap_smaller_than_window_is_rejected() {
    let a = Bitmap::filled(5, 40, [255, 255, 255]);

    let err = compare(&a, &a.clone()).unwrap_err();

    assert!(matches!(err, DiffError::TooSmall { window, .. } if window == WINDOW as u32));
}

// ============================================================================
// SSIM and region primitives
// ============================================================================

#[test]
fn ssim_map_has_input_dimensions_and_is_one_where_unchanged() {
    let a = textured(32, 24).to_gray();
    let mut b = a.clone();
    b.put_pixel(0, 0, Luma([b.get_pixel(0, 0)[0].wrapping_add(90)]));

    let out = structural_similarity(&a, &b).unwrap();

    assert_eq!(out.map.values.len(), 32 * 24);
    assert!((out.map.get(31, 23) - 1.0).abs() < 1e-6, "far corner is untouched");
    assert!(out.map.get(0, 0) < 1.0);
    assert!(out.score < 1.0 && out.score >= 0.0);
}

#[test]
fn ssim_of_identical_grids_is_exactly_one() {
    let a = textured(40, 40).to_gray();

    let out = structural_similarity(&a, &a.clone()).unwrap();

    assert_eq!(out.score, 1.0);
    assert!(out.map.values.iter().all(|&v| v == 1.0));
}

#[test]
fn ssim_rejects_mismatched_grids() {
    let a = textured(16, 16).to_gray();
    let b = textured(16, 24).to_gray();

    assert!(matches!(
        structural_similarity(&a, &b),
        Err(DiffError::DimensionMismatch { .. })
    ));
}

#[test]
fn divergence_rounds_and_binarize_uses_inclusive_threshold() {
    let map = SimilarityMap {
        width: 4,
        height: 1,
        values: vec![1.0, 0.0, 0.5, 1.0 - 30.0 / 255.0],
    };

    let d = divergence(&map);
    assert_eq!(d, vec![0, 255, 128, CHANGE_THRESHOLD]);

    let mask = binarize(&d);
    assert_eq!(mask, vec![false, true, true, true]);
}

#[test]
fn nested_component_inside_ring_is_not_reported_separately() {
    // 12x12 grid: hollow ring from (1,1) to (10,10) with an island at (5,5).
    let (w, h) = (12usize, 12usize);
    let mut mask = vec![false; w * h];
    for i in 1..=10 {
        mask[1 * w + i] = true;
        mask[10 * w + i] = true;
        mask[i * w + 1] = true;
        mask[i * w + 10] = true;
    }
    mask[5 * w + 5] = true;

    let regions = changed_regions(&mask, w, h);

    assert_eq!(
        regions,
        vec![Region {
            x: 1,
            y: 1,
            width: 10,
            height: 10,
        }]
    );
}

#[test]
fn blob_in_open_corner_of_l_shape_is_reported_separately() {
    // Top row and left column of a 20px L; the blob is not enclosed by it.
    let (w, h) = (32usize, 32usize);
    let mut mask = vec![false; w * h];
    for i in 0..20 {
        mask[i] = true;
        mask[i * w] = true;
    }
    mask[15 * w + 15] = true;

    let regions = changed_regions(&mask, w, h);

    assert_eq!(
        regions,
        vec![
            Region {
                x: 0,
                y: 0,
                width: 20,
                height: 20,
            },
            Region {
                x: 15,
                y: 15,
                width: 1,
                height: 1,
            },
        ]
    );
}

#[test]
fn component_inside_a_larger_ring_hole_is_dropped_with_its_neighbours_kept() {
    // Closed ring (2..=12) holding a blob; a second blob sits outside the ring.
    let (w, h) = (24usize, 16usize);
    let mut mask = vec![false; w * h];
    for i in 2..=12 {
        mask[2 * w + i] = true;
        mask[12 * w + i] = true;
        mask[i * w + 2] = true;
        mask[i * w + 12] = true;
    }
    mask[7 * w + 7] = true;
    mask[7 * w + 18] = true;

    let regions = changed_regions(&mask, w, h);

    assert_eq!(regions.len(), 2, "{:?}", regions);
    assert_eq!((regions[0].x, regions[0].y), (2, 2));
    assert_eq!((regions[1].x, regions[1].y), (18, 7));
}

#[test]
fn many_scattered_components_are_extracted_in_linear_time() {
    // One isolated changed pixel every 3px: ~40k components.
    let (w, h) = (600usize, 600usize);
    let mut mask = vec![false; w * h];
    for y in (0..h).step_by(3) {
        for x in (0..w).step_by(3) {
            mask[y * w + x] = true;
        }
    }

    let started = std::time::Instant::now();
    let regions = changed_regions(&mask, w, h);
    let elapsed = started.elapsed();

    assert_eq!(regions.len(), 200 * 200);
    assert!(elapsed.as_secs() < 10, "took {:?}", elapsed);
}

#[test]
fn diagonal_pixels_join_one_component() {
    let (w, h) = (4usize, 4usize);
    let mut mask = vec![false; w * h];
    mask[0] = true;
    mask[w + 1] = true;
    mask[2 * w + 2] = true;

    let regions = changed_regions(&mask, w, h);

    assert_eq!(regions.len(), 1);
    assert_eq!((regions[0].width, regions[0].height), (3, 3));
}

#[test]
fn outline_is_clipped_at_image_edge() {
    let mut bmp = Bitmap::filled(10, 10, [255, 255, 255]);
    let region = Region {
        x: 6,
        y: 6,
        width: 4,
        height: 4,
    };

    draw_outline(&mut bmp, &region, HIGHLIGHT);

    assert_eq!(bmp.pixel(9, 9), HIGHLIGHT);
    assert_eq!(bmp.pixel(6, 6), HIGHLIGHT);
    assert_eq!(bmp.pixel(5, 5), [255, 255, 255]);
}

// ============================================================================
// Bitmap
// ============================================================================

#[test]
fn luminance_uses_bt601_weights() {
    let mut bmp = Bitmap::filled(3, 1, [0, 0, 0]);
    bmp.set_pixel(0, 0, [255, 0, 0]);
    bmp.set_pixel(1, 0, [0, 255, 0]);
    bmp.set_pixel(2, 0, [255, 255, 255]);

    assert_eq!(bmp.luminance(), vec![76, 150, 255]);
}

#[test]
fn png_encoding_preserves_pixels_and_fingerprint() {
    let img = textured(20, 20);
    let decoded = Bitmap::decode(&img.encode_png().unwrap()).unwrap();

    assert_eq!(decoded, img);
    assert_eq!(decoded.fingerprint(), img.fingerprint());
    assert_ne!(
        with_block(&img, 0, 0, 1, 1, [1, 2, 3]).fingerprint(),
        img.fingerprint()
    );
}
