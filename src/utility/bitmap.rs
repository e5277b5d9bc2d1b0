//! # Bitmap
//! An RGBA pixel buffer the key images are composed in.
//!
//! It wraps an `image::RgbaImage` and is an `embedded-graphics` draw target, so shapes and text
//! are drawn with the same primitives as on a display. Compositing, resampling and PNG output come
//! from `image`; on top of that it adds black-mask recoloring and rotation/scaling about the center.
use crate::error::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use core::convert::Infallible;
use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// A fully transparent pixel
pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// An RGBA image, straight (not premultiplied) alpha
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    /// The pixels
    image: RgbaImage,
}

impl Bitmap {
    /// Create a fully transparent bitmap
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Width and height as signed coordinates
    #[allow(clippy::cast_possible_wrap)]
    fn extent(&self) -> (i32, i32) {
        (self.width() as i32, self.height() as i32)
    }

    /// Read a pixel; everything outside the bitmap is transparent
    pub fn pixel(&self, x: i32, y: i32) -> [u8; 4] {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return TRANSPARENT;
        };
        self.image
            .get_pixel_checked(x, y)
            .map_or(TRANSPARENT, |pixel| pixel.0)
    }

    /// Write a pixel; writes outside the bitmap are dropped
    pub fn set_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if let Some(pixel) = self.image.get_pixel_mut_checked(x, y) {
            *pixel = Rgba(rgba);
        }
    }

    /// Recolor every pure black pixel to `target`, keeping its alpha. Other pixels are untouched.
    /// The art is authored in black, so this tints it flat.
    pub fn recolor_black(&mut self, target: Rgb888) {
        for Rgba(pixel) in self.image.pixels_mut() {
            if pixel[0] == 0 && pixel[1] == 0 && pixel[2] == 0 {
                pixel[0] = target.r();
                pixel[1] = target.g();
                pixel[2] = target.b();
            }
        }
    }

    /// Composite `src` over this bitmap with its top left corner at (`x`, `y`).
    pub fn blit(&mut self, src: &Self, x: i32, y: i32) {
        imageops::overlay(&mut self.image, &src.image, i64::from(x), i64::from(y));
    }

    /// Composite `src` centered on this bitmap.
    pub fn blit_centered(&mut self, src: &Self) {
        let (width, height) = self.extent();
        let (src_width, src_height) = src.extent();
        self.blit(src, (width - src_width) / 2, (height - src_height) / 2);
    }

    /// Scale by `scale` and rotate by `degrees` (clockwise on screen) about the center.
    /// The result keeps this bitmap's size; whatever moves outside is clipped.
    #[allow(clippy::cast_precision_loss)]
    pub fn transformed(&self, scale: f32, degrees: f32) -> Self {
        let (width, height) = self.extent();
        let mut out = Self::new(self.width(), self.height());
        let (sin, cos) = degrees.to_radians().sin_cos();
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        for y in 0..height {
            for x in 0..width {
                // map the destination pixel center back into the source
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let sx = (cos * dx + sin * dy) / scale + cx;
                let sy = (-sin * dx + cos * dy) / scale + cy;
                out.set_pixel(x, y, self.sample(sx - 0.5, sy - 0.5));
            }
        }
        out
    }

    /// Resample to `width` x `height`.
    #[must_use]
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self {
            image: imageops::resize(&self.image, width, height, FilterType::Triangle),
        }
    }

    /// Bilinear sample at a fractional position for the rotation, weighting colors by alpha so
    /// transparent neighbours do not darken the edges.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample(&self, fx: f32, fy: f32) -> [u8; 4] {
        let (x0, y0) = (fx.floor(), fy.floor());
        let (tx, ty) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i32, y0 as i32);
        let taps = [
            (x0, y0, (1.0 - tx) * (1.0 - ty)),
            (x0 + 1, y0, tx * (1.0 - ty)),
            (x0, y0 + 1, (1.0 - tx) * ty),
            (x0 + 1, y0 + 1, tx * ty),
        ];

        let mut acc = [0.0_f32; 4];
        for (x, y, weight) in taps {
            let pixel = self.pixel(x, y);
            let alpha = f32::from(pixel[3]) * weight;
            acc[0] += f32::from(pixel[0]) * alpha;
            acc[1] += f32::from(pixel[1]) * alpha;
            acc[2] += f32::from(pixel[2]) * alpha;
            acc[3] += alpha;
        }
        if acc[3] <= 0.0 {
            return TRANSPARENT;
        }
        let channel = |value: f32| value.round().clamp(0.0, 255.0) as u8;
        [
            channel(acc[0] / acc[3]),
            channel(acc[1] / acc[3]),
            channel(acc[2] / acc[3]),
            channel(acc[3]),
        ]
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Encode as a PNG `data:` URL, the form the host takes for key images.
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.to_png()?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

impl OriginDimensions for Bitmap {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl DrawTarget for Bitmap {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, [color.r(), color.g(), color.b(), 255]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    /// A 4x4 bitmap with a black 2x2 square in the middle
    fn square() -> Bitmap {
        let mut bitmap = Bitmap::new(4, 4);
        let _ = Rectangle::new(Point::new(1, 1), Size::new(2, 2))
            .into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
            .draw(&mut bitmap);
        bitmap
    }

    #[test]
    fn draws_opaque_pixels_and_clips() {
        let bitmap = square();
        assert_eq!(bitmap.pixel(1, 1), [0, 0, 0, 255]);
        assert_eq!(bitmap.pixel(0, 0), TRANSPARENT);
        assert_eq!(bitmap.pixel(-1, 7), TRANSPARENT);
    }

    #[test]
    fn recolor_only_touches_black_and_keeps_alpha() {
        let mut bitmap = square();
        bitmap.set_pixel(3, 3, [10, 20, 30, 40]);
        bitmap.set_pixel(0, 3, [0, 0, 0, 128]);
        bitmap.recolor_black(Rgb888::new(0xde, 0xe2, 0x00));

        assert_eq!(bitmap.pixel(1, 1), [0xde, 0xe2, 0x00, 255]);
        assert_eq!(bitmap.pixel(0, 3), [0xde, 0xe2, 0x00, 128]);
        assert_eq!(bitmap.pixel(0, 0), [0xde, 0xe2, 0x00, 0]);
        assert_eq!(bitmap.pixel(3, 3), [10, 20, 30, 40]);
    }

    #[test]
    fn blit_composites_over() {
        let mut canvas = Bitmap::new(4, 4);
        canvas.set_pixel(0, 0, [255, 255, 255, 255]);

        let mut top = Bitmap::new(1, 1);
        top.set_pixel(0, 0, [0, 0, 0, 0]);
        canvas.blit(&top, 0, 0);
        assert_eq!(canvas.pixel(0, 0), [255, 255, 255, 255]);

        top.set_pixel(0, 0, [255, 0, 0, 255]);
        canvas.blit(&top, 0, 0);
        assert_eq!(canvas.pixel(0, 0), [255, 0, 0, 255]);

        top.set_pixel(0, 0, [0, 0, 255, 128]);
        canvas.blit(&top, 3, 3);
        let [r, g, b, a] = canvas.pixel(3, 3);
        assert_eq!([r, g], [0, 0]);
        assert!(b >= 254, "blue {b}");
        assert!((127..=128).contains(&a), "alpha {a}");

        // half covered white turns pink
        top.set_pixel(0, 0, [255, 0, 0, 128]);
        canvas.set_pixel(1, 0, [255, 255, 255, 255]);
        canvas.blit(&top, 1, 0);
        let [r, g, _, a] = canvas.pixel(1, 0);
        assert!(a >= 254, "alpha {a}");
        assert!(r >= 254, "red {r}");
        assert!((126..=128).contains(&g), "green {g}");
    }

    #[test]
    fn identity_transform_keeps_pixels() {
        let bitmap = square();
        assert_eq!(bitmap.transformed(1.0, 0.0), bitmap);
    }

    #[test]
    fn half_turn_is_symmetric_for_a_centered_square() {
        let bitmap = square();
        let turned = bitmap.transformed(1.0, 180.0);
        assert_eq!(turned.pixel(1, 1)[3], 255);
        assert_eq!(turned.pixel(2, 2)[3], 255);
        assert_eq!(turned.pixel(0, 0)[3], 0);
    }

    #[test]
    fn blit_clips_at_the_edges() {
        let mut canvas = Bitmap::new(4, 4);
        canvas.blit(&square(), 2, -2);
        assert_eq!(canvas.pixel(3, 0)[3], 255);
        assert_eq!(canvas.pixel(2, 1), TRANSPARENT);
    }

    #[test]
    fn resize_changes_dimensions() {
        let bitmap = square().resized(3, 5);
        assert_eq!((bitmap.width(), bitmap.height()), (3, 5));
        assert_eq!(Bitmap::new(4, 4).resized(2, 2), Bitmap::new(2, 2));
    }

    #[test]
    fn png_output_is_stable() {
        let first = square().to_png().unwrap();
        let second = square().to_png().unwrap();
        assert_eq!(first, second);
        assert_eq!(&first[..8], b"\x89PNG\r\n\x1a\n");
        assert!(square().to_data_url().unwrap().starts_with("data:image/png;base64,iVBOR"));
    }
}
