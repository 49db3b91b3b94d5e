use ab_glyph::{Font, FontArc, Glyph, GlyphId, PxScale, ScaleFont, point};
use anyhow::{Context, Result, bail};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::{Color, Pixmap, PixmapPaint, PremultipliedColorU8, Transform};
use vasex_cache::{get_text, intern_text, text_count};
use vasex_experiment::TextMeasure;

/// Rasterised text plus where it sits relative to the pen position on the
/// baseline.
pub struct TextSprite {
    pub pixmap: Pixmap,
    pub left: i32,
    pub top: i32,
    pub advance: f32,
}

/// Fonts tried when the configured one cannot be loaded.
pub const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
    FontArc::try_from_vec(bytes).with_context(|| format!("invalid font {}", path.display()))
}

/// Loads the first usable font among `candidates`, in order.
pub fn load_first_font<P: AsRef<Path>>(candidates: &[P]) -> Result<(FontArc, PathBuf)> {
    let mut tried = Vec::with_capacity(candidates.len());
    for path in candidates {
        let path = path.as_ref();
        match load_font(path) {
            Ok(font) => return Ok((font, path.to_path_buf())),
            Err(e) => {
                debug!("{:#}", e);
                tried.push(path.display().to_string());
            }
        }
    }
    bail!("no usable font; tried {}", tried.join(", "))
}

fn layout_glyphs<F: Font>(text: &str, font: &F, scale: PxScale) -> (Vec<Glyph>, f32) {
    let sf = font.as_scaled(scale);
    let mut pen_x = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    let mut glyphs = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = prev {
            pen_x += sf.kern(prev, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, 0.0),
        });
        pen_x += sf.h_advance(id);
        prev = Some(id);
    }
    (glyphs, pen_x)
}

/// Horizontal advance of `text`, in pixels at `size_px`.
pub fn advance_width<F: Font>(font: &F, text: &str, size_px: f32) -> f32 {
    layout_glyphs(text, font, PxScale::from(size_px)).1
}

/// Rasterises `text` with its baseline at y = 0. Returns `None` when nothing
/// is visible, e.g. for an empty or all-whitespace string.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<TextSprite> {
    let (glyphs, advance) = layout_glyphs(text, font, PxScale::from(font_size));

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlines.is_empty() {
        return None;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    let (ox, oy) = (min_x.floor(), min_y.floor());
    let w = (max_x.ceil() - ox).max(1.0) as u32;
    let h = (max_y.ceil() - oy).max(1.0) as u32;

    // Fresh pixmaps are transparent.
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    let cu = color.to_color_u8();
    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - ox) as i32;
            let iy = (y as f32 + b.min.y - oy) as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // Premultiply by coverage * alpha, then source-over onto what
            // earlier glyphs left behind.
            let a_lin = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let inv = 1.0 - a_lin;
            let bg = dst[i];
            let blend = |s: u8, d: u8| ((s as f32 * a_lin) as u8).saturating_add((d as f32 * inv) as u8);
            let r = blend(cu.red(), bg.red());
            let g = blend(cu.green(), bg.green());
            let bl = blend(cu.blue(), bg.blue());
            let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            if let Some(px) = PremultipliedColorU8::from_rgba(r.min(a), g.min(a), bl.min(a), a) {
                dst[i] = px;
            }
        });
    }

    Some(TextSprite {
        pixmap: pm,
        left: ox as i32,
        top: oy as i32,
        advance,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

type SpriteKey = (usize, u32, [u8; 4]);

/// Font plus a cache of rasterised labels keyed by interned text, pixel size
/// and colour. Labels repeat across trials, so each is rasterised once.
pub struct TextPainter {
    font: Option<FontArc>,
    cache: HashMap<SpriteKey, Option<Arc<TextSprite>>>,
}

impl TextPainter {
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            font,
            cache: HashMap::new(),
        }
    }

    #[cfg(test)]
    fn cached_sprites(&self) -> usize {
        self.cache.len()
    }

    fn sprite(&mut self, text: &str, size_px: f32, color: Color) -> Option<Arc<TextSprite>> {
        let font = self.font.as_ref()?;
        let id = intern_text(text);
        let c = color.to_color_u8();
        let key = (id, size_px.to_bits(), [c.red(), c.green(), c.blue(), c.alpha()]);

        self.cache
            .entry(key)
            .or_insert_with(|| {
                debug_assert!(id < text_count());
                let label = get_text(id)?;
                render_text_pixmap(&label, size_px, font, color).map(Arc::new)
            })
            .clone()
    }

    /// Draws `text` with its pen at logical `(x, baseline)`. Coordinates and
    /// size are multiplied by `dpr`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        target: &mut Pixmap,
        text: &str,
        size: f32,
        x: f32,
        baseline: f32,
        align: Align,
        color: Color,
        dpr: f32,
    ) {
        let Some(sprite) = self.sprite(text, size * dpr, color) else {
            return;
        };
        let pen_x = match align {
            Align::Left => x * dpr,
            Align::Right => x * dpr - sprite.advance,
            Align::Center => x * dpr - sprite.advance / 2.0,
        };
        target.draw_pixmap(
            pen_x.round() as i32 + sprite.left,
            (baseline * dpr).round() as i32 + sprite.top,
            sprite.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

/// Text measurement for layout, backed by the loaded font when there is one.
#[derive(Clone)]
pub enum TextMetrics {
    Font(FontArc),
    Approx,
}

impl From<Option<FontArc>> for TextMetrics {
    fn from(font: Option<FontArc>) -> Self {
        match font {
            Some(font) => TextMetrics::Font(font),
            None => TextMetrics::Approx,
        }
    }
}

impl TextMeasure for TextMetrics {
    fn advance_width(&self, text: &str, size_px: f32) -> f32 {
        match self {
            TextMetrics::Font(font) => advance_width(font, text, size_px),
            TextMetrics::Approx => vasex_experiment::ApproxMeasure.advance_width(text, size_px),
        }
    }
}

/// A font for rendering tests: `VASEX_FONT` if set, else the first system
/// font found. Tests that need glyphs skip when there is none.
#[cfg(test)]
pub(crate) fn test_font() -> Option<FontArc> {
    let mut candidates: Vec<PathBuf> = std::env::var_os("VASEX_FONT")
        .map(PathBuf::from)
        .into_iter()
        .collect();
    candidates.extend(SYSTEM_FONTS.iter().map(PathBuf::from));
    match load_first_font(&candidates) {
        Ok((font, _)) => Some(font),
        Err(e) => {
            eprintln!("skipping glyph checks: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn painter_without_font_draws_nothing() {
        let mut painter = TextPainter::new(None);
        let mut pm = Pixmap::new(64, 32).unwrap();
        painter.draw(
            &mut pm,
            "Craving",
            16.0,
            2.0,
            20.0,
            Align::Left,
            Color::WHITE,
            1.0,
        );
        assert!(pm.data().iter().all(|&b| b == 0));
        assert_eq!(painter.cached_sprites(), 0);
    }

    #[test]
    fn approx_metrics_scale_with_size() {
        let m = TextMetrics::Approx;
        let small = m.advance_width("Confirm", 12.0);
        let large = m.advance_width("Confirm", 24.0);
        assert!(small > 0.0);
        assert!((large - 2.0 * small).abs() < 1e-3);
    }

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(load_font(Path::new("/nonexistent/font.ttf")).is_err());
    }

    #[test]
    fn first_usable_font_wins() {
        let err = load_first_font(&["/nonexistent/a.ttf", "/nonexistent/b.ttf"]).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("/nonexistent/a.ttf") && msg.contains("/nonexistent/b.ttf"));

        let Some(_) = test_font() else { return };
        let mut candidates = vec![PathBuf::from("/nonexistent/a.ttf")];
        candidates.extend(SYSTEM_FONTS.iter().map(PathBuf::from));
        if let Some(var) = std::env::var_os("VASEX_FONT") {
            candidates.insert(1, PathBuf::from(var));
        }
        let (_, path) = load_first_font(&candidates).unwrap();
        assert_ne!(path, PathBuf::from("/nonexistent/a.ttf"));
    }

    #[test]
    fn label_rasterises_with_its_advance() {
        let Some(font) = test_font() else { return };
        let sprite = render_text_pixmap("Craving", 16.0, &font, Color::WHITE).unwrap();
        assert!(sprite.advance > 0.0);
        assert!((sprite.advance - advance_width(&font, "Craving", 16.0)).abs() < 1e-3);
        // ink sits above the baseline and is premultiplied white
        assert!(sprite.top < 0);
        let inked: Vec<_> = sprite.pixmap.pixels().iter().filter(|p| p.alpha() > 0).collect();
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|p| p.red().abs_diff(p.alpha()) <= 1));

        assert!(render_text_pixmap("   ", 16.0, &font, Color::WHITE).is_none());
        assert!(render_text_pixmap("", 16.0, &font, Color::WHITE).is_none());
    }

    #[test]
    fn sprites_are_cached_per_label_and_size() {
        let Some(font) = test_font() else { return };
        let mut painter = TextPainter::new(Some(font));
        let mut pm = Pixmap::new(200, 40).unwrap();
        for _ in 0..3 {
            painter.draw(&mut pm, "Valence", 16.0, 4.0, 24.0, Align::Left, Color::WHITE, 1.0);
        }
        assert_eq!(painter.cached_sprites(), 1);
        painter.draw(&mut pm, "Valence", 12.0, 4.0, 24.0, Align::Left, Color::WHITE, 1.0);
        assert_eq!(painter.cached_sprites(), 2);
        assert!(pm.pixels().iter().any(|p| p.alpha() > 0));
    }

    #[test]
    fn font_metrics_drive_measurement() {
        let Some(font) = test_font() else { return };
        let m = TextMetrics::from(Some(font.clone()));
        assert_eq!(m.advance_width("Confirm", 18.0), advance_width(&font, "Confirm", 18.0));
        assert!(matches!(TextMetrics::from(None), TextMetrics::Approx));
    }
}
