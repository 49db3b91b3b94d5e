use anyhow::{Context, Result, anyhow, ensure};
use bytemuck::cast_slice;
use std::path::Path;
use tiny_skia::{ColorU8, Pixmap};

/// Builds a premultiplied pixmap from straight RGBA8 pixels.
pub fn pixmap_from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Pixmap> {
    ensure!(
        rgba.len() == width as usize * height as usize * 4,
        "expected {}×{} RGBA pixels, got {} bytes",
        width,
        height,
        rgba.len()
    );
    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| anyhow!("cannot allocate {width}×{height} image"))?;

    let src: &[[u8; 4]] = cast_slice(rgba);
    for (dst, &[r, g, b, a]) in pixmap.pixels_mut().iter_mut().zip(src) {
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Decodes a stimulus image from disk.
pub fn load_stimulus(path: &Path) -> Result<Pixmap> {
    let img = image::open(path)
        .with_context(|| format!("failed to decode stimulus {}", path.display()))?
        .into_rgba8();
    let (w, h) = img.dimensions();
    pixmap_from_rgba(w, h, img.as_raw())
}
