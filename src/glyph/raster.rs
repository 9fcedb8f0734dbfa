//! Glyph compositing and supersample reduction.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::{PackError, Result};
use crate::types::Colour;

use super::font::{GlyphFace, RasterGlyph};

/// Rendering parameters at output resolution.
#[derive(Debug, Clone, Copy)]
pub struct RasterOptions {
    pub width: u32,
    pub height: u32,
    pub font_size: f32,
    pub color: Colour,
    /// Supersampling factor; 1 renders directly at output size.
    pub supersample: u32,
}

impl RasterOptions {
    fn factor(&self) -> u32 {
        self.supersample.max(1)
    }

    /// Canvas size while drawing.
    pub fn working_size(&self) -> (u32, u32) {
        (self.width * self.factor(), self.height * self.factor())
    }
}

/// Resize a background image to the working canvas size.
pub fn prepare_background(background: &RgbaImage, options: &RasterOptions) -> RgbaImage {
    let (w, h) = options.working_size();
    if background.dimensions() == (w, h) {
        return background.clone();
    }
    imageops::resize(background, w, h, FilterType::Lanczos3)
}

/// Render one character centred on a canvas.
///
/// `background` must already be at working size (see [`prepare_background`]).
pub fn render_glyph(
    face: &dyn GlyphFace,
    ch: char,
    options: &RasterOptions,
    background: Option<&RgbaImage>,
) -> Result<RgbaImage> {
    let factor = options.factor();
    let (w, h) = options.working_size();

    let mut canvas = match background {
        Some(bg) => bg.clone(),
        None => RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0])),
    };

    let glyph = face
        .rasterize(ch, options.font_size * factor as f32)
        .ok_or_else(|| PackError::GlyphRender {
            glyph: ch.to_string(),
            message: format!("not present in font {}", face.name()),
        })?;
    if glyph.width == 0 || glyph.height == 0 {
        return Err(PackError::GlyphRender {
            glyph: ch.to_string(),
            message: "glyph has no visible ink".to_string(),
        });
    }

    // Centre the ink box, then walk back through the bearings to the pen
    // origin on the baseline. The offset snaps to whole output pixels so
    // supersampled strokes land on sample blocks.
    let step = factor as i64;
    let ink_x = ((w as i64 - glyph.width as i64) / 2).div_euclid(step) * step;
    let ink_y = ((h as i64 - glyph.height as i64) / 2).div_euclid(step) * step;
    let pen_x = ink_x - glyph.left as i64;
    let baseline = ink_y + glyph.top as i64;

    draw(&mut canvas, &glyph, pen_x, baseline, options.color);

    if factor > 1 {
        canvas = downsample(&canvas, factor);
    }
    Ok(canvas)
}

fn draw(canvas: &mut RgbaImage, glyph: &RasterGlyph, pen_x: i64, baseline: i64, color: Colour) {
    let (w, h) = canvas.dimensions();
    let origin_x = pen_x + glyph.left as i64;
    let origin_y = baseline - glyph.top as i64;

    for gy in 0..glyph.height {
        let y = origin_y + gy as i64;
        if y < 0 || y >= h as i64 {
            continue;
        }
        for gx in 0..glyph.width {
            let x = origin_x + gx as i64;
            if x < 0 || x >= w as i64 {
                continue;
            }
            let coverage = glyph.coverage[gy * glyph.width + gx];
            if coverage == 0 {
                continue;
            }
            let alpha = coverage as u32 * color.a as u32 / 255;
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            *pixel = blend_over(*pixel, color, alpha as u8);
        }
    }
}

/// Source-over compositing in straight alpha.
fn blend_over(dst: Rgba<u8>, src: Colour, src_alpha: u8) -> Rgba<u8> {
    let sa = src_alpha as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| {
        let value = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(src.r, dst[0]),
        channel(src.g, dst[1]),
        channel(src.b, dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Box-filter reduction by an integer factor, averaging in premultiplied
/// alpha so transparent pixels do not darken edges.
pub fn downsample(image: &RgbaImage, factor: u32) -> RgbaImage {
    let out_w = image.width() / factor;
    let out_h = image.height() / factor;
    let samples = (factor * factor) as u64;

    RgbaImage::from_fn(out_w, out_h, |ox, oy| {
        let mut sum = [0u64; 4];
        for dy in 0..factor {
            for dx in 0..factor {
                let p = image.get_pixel(ox * factor + dx, oy * factor + dy);
                let a = p[3] as u64;
                sum[0] += p[0] as u64 * a;
                sum[1] += p[1] as u64 * a;
                sum[2] += p[2] as u64 * a;
                sum[3] += a;
            }
        }

        if sum[3] == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let unpremultiply = |c: u64| ((c + sum[3] / 2) / sum[3]) as u8;
        Rgba([
            unpremultiply(sum[0]),
            unpremultiply(sum[1]),
            unpremultiply(sum[2]),
            ((sum[3] + samples / 2) / samples) as u8,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::builtin::BuiltinFace;

    fn options(supersample: u32) -> RasterOptions {
        RasterOptions {
            width: 16,
            height: 16,
            font_size: 8.0,
            color: Colour::WHITE,
            supersample,
        }
    }

    fn ink_bounds(image: &RgbaImage) -> (u32, u32, u32, u32) {
        let mut bounds = (u32::MAX, u32::MAX, 0, 0);
        for (x, y, p) in image.enumerate_pixels() {
            if p[3] > 0 {
                bounds.0 = bounds.0.min(x);
                bounds.1 = bounds.1.min(y);
                bounds.2 = bounds.2.max(x);
                bounds.3 = bounds.3.max(y);
            }
        }
        bounds
    }

    #[test]
    fn test_glyph_is_centred() {
        let image = render_glyph(&BuiltinFace, 'H', &options(1), None).unwrap();
        assert_eq!(image.dimensions(), (16, 16));
        // 5x7 ink box in a 16x16 canvas
        assert_eq!(ink_bounds(&image), (5, 4, 9, 10));
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*image.get_pixel(5, 4), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_bearings_do_not_shift_centre() {
        struct Offset;
        impl GlyphFace for Offset {
            fn name(&self) -> &str {
                "offset"
            }
            fn rasterize(&self, ch: char, px: f32) -> Option<RasterGlyph> {
                let mut glyph = BuiltinFace.rasterize(ch, px)?;
                glyph.left = 7;
                glyph.top = -3;
                Some(glyph)
            }
        }

        let plain = render_glyph(&BuiltinFace, 'H', &options(1), None).unwrap();
        let shifted = render_glyph(&Offset, 'H', &options(1), None).unwrap();
        assert_eq!(plain, shifted);
    }

    #[test]
    fn test_supersampled_output_size() {
        let image = render_glyph(&BuiltinFace, 'A', &options(4), None).unwrap();
        assert_eq!(image.dimensions(), (16, 16));
        assert!(image.pixels().any(|p| p[3] == 255));
    }

    #[test]
    fn test_supersampled_strokes_align_with_output_pixels() {
        let plain = render_glyph(&BuiltinFace, 'A', &options(1), None).unwrap();
        let smooth = render_glyph(&BuiltinFace, 'A', &options(4), None).unwrap();
        assert_eq!(ink_bounds(&smooth), ink_bounds(&plain));
        assert!(smooth.pixels().all(|p| p[3] == 0 || p[3] == 255));
    }

    #[test]
    fn test_missing_glyph_is_render_error() {
        struct Empty;
        impl GlyphFace for Empty {
            fn name(&self) -> &str {
                "empty"
            }
            fn rasterize(&self, _: char, _: f32) -> Option<RasterGlyph> {
                None
            }
        }
        assert!(matches!(
            render_glyph(&Empty, 'A', &options(1), None),
            Err(PackError::GlyphRender { .. })
        ));
    }

    #[test]
    fn test_draws_over_background() {
        let background = RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 255]));
        let mut opts = options(1);
        opts.color = Colour::BLACK;
        let image = render_glyph(&BuiltinFace, 'H', &opts, Some(&background)).unwrap();

        assert_eq!(*image.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*image.get_pixel(5, 4), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_downsample_premultiplied() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let out = downsample(&image, 2);
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 0, 0, 64]));
    }

    #[test]
    fn test_background_resized_to_working_size() {
        let background = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        let prepared = prepare_background(&background, &options(2));
        assert_eq!(prepared.dimensions(), (32, 32));
    }
}
