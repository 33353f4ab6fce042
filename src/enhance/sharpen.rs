use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharpenSettings {
    pub amount: f32,
    pub contrast_boost: f32,
}

impl Default for SharpenSettings {
    fn default() -> Self {
        Self {
            amount: 0.6,
            contrast_boost: 1.1,
        }
    }
}

/// Single-pass Laplacian sharpen with an optional contrast stretch around the
/// midpoint, applied per RGB channel. Alpha is left untouched.
///
/// All reads go through a snapshot taken before the first write, and the 1px
/// border ring is deliberately left unmodified; round-trip determinism relies
/// on that edge behavior, so it must not be "fixed" quietly.
pub fn sharpen(buffer: &mut RgbaImage, settings: SharpenSettings) {
    let (width, height) = buffer.dimensions();
    if width < 3 || height < 3 {
        return;
    }

    let snapshot = buffer.as_raw().clone();
    let stride = (width as usize) * 4;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let idx = (y as usize * width as usize + x as usize) * 4;
            let mut pixel = [0u8; 4];
            pixel[3] = snapshot[idx + 3];

            for channel in 0..3 {
                let center = snapshot[idx + channel] as f32;
                let left = snapshot[idx - 4 + channel] as f32;
                let right = snapshot[idx + 4 + channel] as f32;
                let top = snapshot[idx - stride + channel] as f32;
                let bottom = snapshot[idx + stride + channel] as f32;

                // 4-neighbor discrete Laplacian
                let laplacian = 4.0 * center - left - right - top - bottom;
                let mut value = center + settings.amount * laplacian;
                value = (value - 128.0) * settings.contrast_boost + 128.0;

                pixel[channel] = value.clamp(0.0, 255.0).round() as u8;
            }

            buffer.put_pixel(x, y, Rgba(pixel));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: SharpenSettings = SharpenSettings {
        amount: 0.0,
        contrast_boost: 1.0,
    };

    fn gradient_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 13) % 256) as u8;
            Rgba([v, v.wrapping_add(40), v.wrapping_mul(3), 255])
        })
    }

    #[test]
    fn identity_settings_leave_buffer_unchanged() {
        let original = gradient_image(16, 12);
        let mut sharpened = original.clone();

        sharpen(&mut sharpened, IDENTITY);

        assert_eq!(original.as_raw(), sharpened.as_raw());
    }

    #[test]
    fn border_ring_is_never_modified() {
        let original = gradient_image(10, 10);
        let mut sharpened = original.clone();

        sharpen(&mut sharpened, SharpenSettings::default());

        for x in 0..10 {
            assert_eq!(original.get_pixel(x, 0), sharpened.get_pixel(x, 0));
            assert_eq!(original.get_pixel(x, 9), sharpened.get_pixel(x, 9));
        }
        for y in 0..10 {
            assert_eq!(original.get_pixel(0, y), sharpened.get_pixel(0, y));
            assert_eq!(original.get_pixel(9, y), sharpened.get_pixel(9, y));
        }
    }

    #[test]
    fn amplifies_a_bright_spot_against_dark_surround() {
        let mut buffer = RgbaImage::from_pixel(5, 5, Rgba([40, 40, 40, 255]));
        buffer.put_pixel(2, 2, Rgba([200, 200, 200, 255]));
        let before = buffer.get_pixel(2, 2)[0];

        sharpen(
            &mut buffer,
            SharpenSettings {
                amount: 0.5,
                contrast_boost: 1.0,
            },
        );

        assert!(buffer.get_pixel(2, 2)[0] >= before);
        // Direct neighbors of the spot are pushed down by the Laplacian.
        assert!(buffer.get_pixel(1, 2)[0] < 40);
    }

    #[test]
    fn output_stays_clamped_for_strong_settings() {
        let mut buffer = gradient_image(32, 32);
        sharpen(
            &mut buffer,
            SharpenSettings {
                amount: 5.0,
                contrast_boost: 3.0,
            },
        );
        // u8 storage clamps by construction; what matters is no panic and
        // alpha survival.
        assert!(buffer.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn tiny_images_are_left_alone() {
        let original = gradient_image(2, 2);
        let mut sharpened = original.clone();

        sharpen(&mut sharpened, SharpenSettings::default());

        assert_eq!(original.as_raw(), sharpened.as_raw());
    }
}
