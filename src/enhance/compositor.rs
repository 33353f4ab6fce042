use image::{imageops, DynamicImage, Rgba, RgbaImage};

use super::dimensions::Dimensions;

/// Canvas fill behind the scaled source; also what transparent source pixels
/// blend against, so the output never carries alpha gaps.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Places `source` on a canvas of exactly `target` size using cover-fit
/// scaling: the image is scaled up to fully cover the canvas, centered, and
/// excess is cropped. Resampling is Lanczos3, never nearest-neighbor.
pub fn composite_cover(source: &DynamicImage, target: Dimensions) -> RgbaImage {
    let source_width = source.width().max(1);
    let source_height = source.height().max(1);

    let scale = f64::max(
        target.width as f64 / source_width as f64,
        target.height as f64 / source_height as f64,
    );
    let scaled_width = ((source_width as f64) * scale).round().max(1.0) as u32;
    let scaled_height = ((source_height as f64) * scale).round().max(1.0) as u32;

    // Negative offsets mean the scaled image overhangs the canvas and is cropped.
    let offset_x = (target.width as i64 - scaled_width as i64) / 2;
    let offset_y = (target.height as i64 - scaled_height as i64) / 2;

    let scaled = imageops::resize(
        source,
        scaled_width,
        scaled_height,
        imageops::FilterType::Lanczos3,
    );

    let mut canvas = RgbaImage::from_pixel(target.width, target.height, BACKGROUND);
    imageops::overlay(&mut canvas, &scaled, offset_x, offset_y);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_source(width: u32, height: u32, pixel: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(pixel)))
    }

    #[test]
    fn output_matches_target_dimensions_exactly() {
        let source = solid_source(800, 600, [10, 20, 30, 255]);
        let target = Dimensions { width: 1920, height: 1080 };

        let canvas = composite_cover(&source, target);

        assert_eq!(canvas.dimensions(), (1920, 1080));
        assert_eq!(canvas.as_raw().len(), 1920 * 1080 * 4);
    }

    #[test]
    fn wide_source_into_tall_target_is_cropped_not_letterboxed() {
        let source = solid_source(400, 100, [200, 0, 0, 255]);
        let target = Dimensions { width: 100, height: 200 };

        let canvas = composite_cover(&source, target);

        // Cover-fit means every canvas pixel comes from the source, including
        // the corners that a contain-fit would have left white.
        assert_eq!(canvas.get_pixel(0, 0)[0], 200);
        assert_eq!(canvas.get_pixel(99, 199)[0], 200);
        assert_eq!(canvas.get_pixel(50, 100)[0], 200);
    }

    #[test]
    fn every_output_pixel_is_opaque() {
        let source = solid_source(3, 5, [0, 0, 0, 0]);
        let target = Dimensions { width: 64, height: 64 };

        let canvas = composite_cover(&source, target);

        assert!(canvas.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn transparent_source_blends_to_white() {
        let source = solid_source(10, 10, [0, 0, 0, 0]);
        let target = Dimensions { width: 20, height: 20 };

        let canvas = composite_cover(&source, target);

        let center = canvas.get_pixel(10, 10);
        assert_eq!(center, &BACKGROUND);
    }
}
