//! Raster cleanup ahead of recognition: inversion, smoothing, local
//! thresholding, speckle removal, and deskew.

use image::{imageops, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::geometry::min_area_rect;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use imageproc::morphology::open;
use imageproc::point::Point;
use tracing::debug;

use super::backend::OcrConfig;

/// Mean pixel intensity (0-255).
pub fn mean_brightness(image: &GrayImage) -> f64 {
    let n = (image.width() as u64 * image.height() as u64).max(1);
    let sum: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / n as f64
}

/// Rotate clockwise by a multiple of 90 degrees. Other angles are ignored.
pub fn rotate_quadrant(image: GrayImage, degrees: u32) -> GrayImage {
    match degrees % 360 {
        90 => imageops::rotate90(&image),
        180 => imageops::rotate180(&image),
        270 => imageops::rotate270(&image),
        _ => image,
    }
}

/// Local-mean threshold: a pixel is white when brighter than its
/// neighbourhood mean minus `offset`.
pub fn adaptive_threshold(image: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }

    let integral = integral_image::<_, u64>(image);
    let r = block_radius;
    GrayImage::from_fn(w, h, |x, y| {
        let (x0, y0) = (x.saturating_sub(r), y.saturating_sub(r));
        let (x1, y1) = ((x + r).min(w - 1), (y + r).min(h - 1));
        let area = ((x1 - x0 + 1) as u64 * (y1 - y0 + 1) as u64) as f64;
        let sum = sum_image_pixels(&integral, x0, y0, x1, y1)[0];
        let mean = sum as f64 / area;
        let value = image.get_pixel(x, y).0[0] as f64;
        if value > mean - offset as f64 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Remove isolated dark specks with a morphological opening of the ink.
pub fn remove_speckles(binary: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binary.clone();
    }
    let mut ink = binary.clone();
    imageops::invert(&mut ink);
    let mut opened = open(&ink, Norm::LInf, radius);
    imageops::invert(&mut opened);
    opened
}

/// Grayscale page to black-on-white binary.
pub fn binarize(gray: &GrayImage, config: &OcrConfig) -> GrayImage {
    let mut gray = gray.clone();
    // Light text on a dark background.
    if mean_brightness(&gray) < config.dark_mean_threshold {
        imageops::invert(&mut gray);
    }
    let smoothed = median_filter(&gray, 1, 1);
    let binary = adaptive_threshold(
        &smoothed,
        config.threshold_block_radius,
        config.threshold_offset,
    );
    remove_speckles(&binary, config.speckle_radius)
}

/// Map a rectangle edge angle in [-90, 0) to the correcting rotation.
///
/// Angles at or below -45 belong to the near-vertical edge.
pub fn deskew_correction(angle: f64) -> f64 {
    if angle <= -45.0 {
        -(90.0 + angle)
    } else {
        -angle
    }
}

/// Orientation of a rotated rectangle, normalized to [-90, 0).
fn rect_angle(rect: &[Point<i32>; 4]) -> f64 {
    let dx = (rect[1].x - rect[0].x) as f64;
    let dy = (rect[1].y - rect[0].y) as f64;
    let mut angle = dy.atan2(dx).to_degrees();
    while angle >= 0.0 {
        angle -= 90.0;
    }
    while angle < -90.0 {
        angle += 90.0;
    }
    angle
}

/// Straighten a binary page using the minimum-area rectangle of its ink.
pub fn deskew(binary: &GrayImage, min_pixels: usize) -> GrayImage {
    let points: Vec<Point<i32>> = binary
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] == 0)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect();

    if points.len() < min_pixels {
        debug!("deskew skipped: {} foreground pixels", points.len());
        return binary.clone();
    }

    let rect = min_area_rect(&points);
    let correction = deskew_correction(rect_angle(&rect));
    if correction.abs() < 0.05 {
        return binary.clone();
    }

    debug!("deskew by {:.2} degrees", correction);
    rotate_about_center(
        binary,
        correction.to_radians() as f32,
        Interpolation::Bilinear,
        Luma([255]),
    )
}
