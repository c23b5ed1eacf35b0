use std::path::Path;

use image::{ImageFormat, RgbaImage};
use resvg::tiny_skia;

use crate::{MandalaError, Result, Rgb};

/// Largest raster edge accepted for export.
const MAX_DIM: u32 = 16_384;

/// Rasterises an SVG document to `width` x `height` straight-alpha RGBA.
///
/// The document is stretched to fill the raster. With a `background` the
/// image is fully opaque; otherwise uncovered pixels stay transparent.
pub fn rasterize_svg(
    svg: &str,
    width: u32,
    height: u32,
    background: Option<Rgb>,
) -> Result<RgbaImage> {
    if width == 0 || height == 0 || width > MAX_DIM || height > MAX_DIM {
        return Err(MandalaError::Export(format!(
            "raster size {width}x{height} outside 1..={MAX_DIM}"
        )));
    }

    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())
        .map_err(|err| MandalaError::Export(format!("failed to parse svg: {err}")))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| MandalaError::Export("failed to allocate pixmap".to_string()))?;
    if let Some(colour) = background {
        pixmap.fill(tiny_skia::Color::from_rgba8(colour.r, colour.g, colour.b, u8::MAX));
    }

    let sx = width as f32 / tree.size().width();
    let sy = height as f32 / tree.size().height();
    resvg::render(&tree, tiny_skia::Transform::from_scale(sx, sy), &mut pixmap.as_mut());

    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let colour = pixel.demultiply();
        rgba.extend_from_slice(&[colour.red(), colour.green(), colour.blue(), colour.alpha()]);
    }
    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| MandalaError::Export("raster buffer has the wrong size".to_string()))
}

/// Rasterises `svg` and writes it as a PNG file.
pub fn save_png(
    svg: &str,
    width: u32,
    height: u32,
    background: Option<Rgb>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let image = rasterize_svg(svg, width, height, background)?;
    image.save_with_format(path, ImageFormat::Png)?;
    tracing::info!(path = %path.display(), width, height, "exported png");
    Ok(())
}
