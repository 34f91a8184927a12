use std::collections::{BTreeMap, BTreeSet};

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::detection::preprocessing::{Bitmap, FILLED};
use crate::models::{Blob, BoundingBox, MarkerPoint};

/// Label the outermost connected foreground regions inside `region` of the bitmap.
///
/// A region lying inside another region's hole is not reported. Coordinates
/// in the returned blobs are in full-image space. Regions are returned in
/// label order, which depends only on the pixel scan.
pub fn find_blobs(bitmap: &Bitmap, region: &BoundingBox) -> Vec<Blob> {
    let Some(region) = region.clip(bitmap.width(), bitmap.height()) else {
        return Vec::new();
    };

    let window = image::imageops::crop_imm(
        bitmap.as_image(),
        region.x,
        region.y,
        region.width,
        region.height,
    )
    .to_image();

    // Foreground is 255, background 0
    let labeled = connected_components(&window, Connectivity::Eight, Luma([0u8]));

    let mut regions: BTreeMap<u32, Blob> = BTreeMap::new();
    for (x, y, label) in labeled.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        let (gx, gy) = (x + region.x, y + region.y);

        regions
            .entry(label)
            .and_modify(|blob| {
                blob.min_x = blob.min_x.min(gx);
                blob.min_y = blob.min_y.min(gy);
                blob.max_x = blob.max_x.max(gx);
                blob.max_y = blob.max_y.max(gy);
                blob.pixel_count += 1;
                blob.sum_x += gx as u64;
                blob.sum_y += gy as u64;
            })
            .or_insert(Blob {
                label,
                min_x: gx,
                min_y: gy,
                max_x: gx,
                max_y: gy,
                pixel_count: 1,
                sum_x: gx as u64,
                sum_y: gy as u64,
            });
    }

    let external = external_labels(&window, &labeled);
    regions
        .into_values()
        .filter(|blob| external.contains(&blob.label))
        .collect()
}

/// Foreground labels that touch the window border or the paper outside every hole.
///
/// Paper is labelled with 4-connectivity, the dual of the 8-connected ink, so
/// a paper region that never reaches the border is a hole.
fn external_labels(window: &GrayImage, labeled: &ImageBuffer<Luma<u32>, Vec<u32>>) -> BTreeSet<u32> {
    let (width, height) = window.dimensions();
    let on_border = |x: u32, y: u32| x == 0 || y == 0 || x + 1 == width || y + 1 == height;

    let paper = connected_components(window, Connectivity::Four, Luma([FILLED]));
    let outside: BTreeSet<u32> = paper
        .enumerate_pixels()
        .filter(|(x, y, label)| label[0] != 0 && on_border(*x, *y))
        .map(|(_, _, label)| label[0])
        .collect();
    let is_outside = |x: u32, y: u32| outside.contains(&paper.get_pixel(x, y)[0]);

    let mut external = BTreeSet::new();
    for (x, y, label) in labeled.enumerate_pixels() {
        let label = label[0];
        if label == 0 || external.contains(&label) {
            continue;
        }
        let touches_outside = on_border(x, y)
            || is_outside(x - 1, y)
            || is_outside(x + 1, y)
            || is_outside(x, y - 1)
            || is_outside(x, y + 1);
        if touches_outside {
            external.insert(label);
        }
    }
    external
}

/// Centroids of every blob inside `region`. Order is not meaningful.
pub fn locate_blobs(bitmap: &Bitmap, region: &BoundingBox) -> Vec<MarkerPoint> {
    find_blobs(bitmap, region)
        .iter()
        .filter_map(Blob::centroid)
        .collect()
}
