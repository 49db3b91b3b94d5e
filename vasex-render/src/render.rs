use ab_glyph::FontArc;
use anyhow::{Result, anyhow, bail};
use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Transform,
};
use vasex_experiment::{Rect, TrialView, ViewLayout};
use vasex_timing::{FrameTimingStats, HighPrecisionTimer, Timer};

use crate::scales::{backing_size, draw_scales};
use crate::text::{Align, TextPainter};

const BACKGROUND: Color = Color::BLACK;
const DISABLED_OPACITY: f32 = 0.4;

fn button_face(pressed: bool) -> Color {
    if pressed {
        Color::from_rgba8(214, 214, 214, 255)
    } else {
        Color::from_rgba8(239, 239, 239, 255)
    }
}

pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
}

/// Draws a trial view into a window-sized, premultiplied RGBA frame.
///
/// The frame is opaque, so its bytes can be copied straight into a
/// non-premultiplied surface buffer.
pub struct SkiaRenderer {
    dpr: f32,

    frame: Pixmap,
    scale_canvas: Option<Pixmap>,
    stimulus: Option<Pixmap>,
    text: TextPainter,

    component_timers: HashMap<&'static str, HighPrecisionTimer>,
}

impl SkiaRenderer {
    /// `width`/`height` are in device pixels; `dpr` is device pixels per
    /// logical pixel.
    pub fn new(width: u32, height: u32, dpr: f32, font: Option<FontArc>) -> Result<Self> {
        let mut frame = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| anyhow!("cannot allocate {width}×{height} frame"))?;
        frame.fill(BACKGROUND);

        Ok(Self {
            dpr: if dpr > 0.0 { dpr } else { 1.0 },
            frame,
            scale_canvas: None,
            stimulus: None,
            text: TextPainter::new(font),
            component_timers: ["draw", "copy", "total"]
                .into_iter()
                .map(|k| (k, HighPrecisionTimer::new()))
                .collect(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32, dpr: f32) -> Result<()> {
        self.frame = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| anyhow!("cannot allocate {width}×{height} frame"))?;
        self.frame.fill(BACKGROUND);
        if dpr > 0.0 {
            self.dpr = dpr;
        }
        self.scale_canvas = None;
        Ok(())
    }

    pub fn set_stimulus(&mut self, stimulus: Option<Pixmap>) {
        self.stimulus = stimulus;
    }

    /// Top-left of the trial frame in logical window coordinates; the frame is
    /// centred horizontally and pinned to the top.
    pub fn frame_origin(&self, layout: &ViewLayout) -> (f32, f32) {
        let logical_w = self.frame.width() as f32 / self.dpr;
        (((logical_w - layout.frame.width) / 2.0).max(0.0).floor(), 0.0)
    }

    /// Converts a device-pixel window position to frame coordinates.
    pub fn to_frame(&self, layout: &ViewLayout, px: f64, py: f64) -> (f32, f32) {
        let (ox, oy) = self.frame_origin(layout);
        (px as f32 / self.dpr - ox, py as f32 / self.dpr - oy)
    }

    pub fn frame(&self) -> &Pixmap {
        &self.frame
    }

    pub fn timing_summary(&self) -> Vec<(&'static str, FrameTimingStats)> {
        let mut out: Vec<_> = self
            .component_timers
            .iter()
            .map(|(k, t)| (*k, t.frame_stats()))
            .collect();
        out.sort_by_key(|(k, _)| *k);
        out
    }

    /// Redraws the frame and copies it into `frame_buffer` (RGBA8, same size
    /// as the renderer).
    pub fn render_frame<T: Timer<Timestamp = u64>>(
        &mut self,
        view: Option<&TrialView<'_>>,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats> {
        if frame_buffer.len() != self.frame.data().len() {
            bail!(
                "frame buffer holds {} bytes, renderer expects {}",
                frame_buffer.len(),
                self.frame.data().len()
            );
        }

        let t_draw = {
            let t = timer.now();
            self.draw_view(view)?;
            timer.elapsed(t)
        };

        let t_copy = {
            let t = timer.now();
            frame_buffer.copy_from_slice(self.frame.data());
            timer.elapsed(t)
        };

        let total = t_draw + t_copy;
        for (key, d) in [("draw", t_draw), ("copy", t_copy), ("total", total)] {
            if let Some(t) = self.component_timers.get_mut(key) {
                t.record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(FrameStats {
            draw: t_draw,
            copy: t_copy,
            total,
        })
    }

    /// Redraws the whole frame from `view`.
    pub fn draw_view(&mut self, view: Option<&TrialView<'_>>) -> Result<()> {
        self.frame.fill(BACKGROUND);
        let Some(view) = view else {
            return Ok(());
        };

        let layout = view.layout;
        let dpr = self.dpr;
        let (ox, oy) = self.frame_origin(layout);
        let at = |r: &Rect| Rect::new(ox + r.x, oy + r.y, r.width, r.height);

        if let Some(stimulus) = &self.stimulus {
            draw_contained(&mut self.frame, stimulus, &at(&layout.image_box), dpr);
        }

        let (cw, ch) = backing_size(layout.scales.width, layout.scales.height, dpr);
        let mut canvas = match self.scale_canvas.take() {
            Some(pm) if pm.width() == cw && pm.height() == ch => pm,
            _ => {
                debug!("Allocating {}×{} scale canvas", cw, ch);
                Pixmap::new(cw, ch).ok_or_else(|| anyhow!("cannot allocate {cw}×{ch} canvas"))?
            }
        };
        draw_scales(&mut canvas, view, dpr, &mut self.text);
        let c = at(&layout.canvas);
        self.frame.draw_pixmap(
            (c.x * dpr).round() as i32,
            (c.y * dpr).round() as i32,
            canvas.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        self.scale_canvas = Some(canvas);

        self.draw_button(view, &at(&layout.button));
        Ok(())
    }

    fn draw_button(&mut self, view: &TrialView<'_>, rect: &Rect) {
        let dpr = self.dpr;
        let style = &view.layout.button_style;
        let enabled = view.button.is_enabled();

        let mut face = button_face(view.button.is_pressed());
        if !enabled {
            face.apply_opacity(DISABLED_OPACITY);
        }
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(face);
        if let Some(path) = rounded_rect(rect, style.radius) {
            self.frame.fill_path(
                &path,
                &paint,
                FillRule::Winding,
                Transform::from_scale(dpr, dpr),
                None,
            );
        }

        let mut ink = Color::BLACK;
        if !enabled {
            ink.apply_opacity(DISABLED_OPACITY);
        }
        let baseline = rect.y + rect.height / 2.0 + style.font * 0.35;
        self.text.draw(
            &mut self.frame,
            &view.config.button_label,
            style.font,
            rect.x + rect.width / 2.0,
            baseline,
            Align::Center,
            ink,
            dpr,
        );
    }
}

/// Scales `image` to fit inside `rect` keeping its aspect ratio, centred.
fn draw_contained(target: &mut Pixmap, image: &Pixmap, rect: &Rect, dpr: f32) {
    let (iw, ih) = (image.width() as f32, image.height() as f32);
    let fit = (rect.width / iw).min(rect.height / ih);
    if !fit.is_finite() || fit <= 0.0 {
        return;
    }
    let (dw, dh) = (iw * fit, ih * fit);
    let x = rect.x + (rect.width - dw) / 2.0;
    let y = rect.y + (rect.height - dh) / 2.0;

    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    let transform = Transform::from_row(fit * dpr, 0.0, 0.0, fit * dpr, x * dpr, y * dpr);
    target.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
}

fn rounded_rect(r: &Rect, radius: f32) -> Option<Path> {
    let rad = radius.min(r.width / 2.0).min(r.height / 2.0).max(0.0);
    let (x0, y0, x1, y1) = (r.x, r.y, r.right(), r.bottom());
    let mut pb = PathBuilder::new();
    pb.move_to(x0 + rad, y0);
    pb.line_to(x1 - rad, y0);
    pb.quad_to(x1, y0, x1, y0 + rad);
    pb.line_to(x1, y1 - rad);
    pb.quad_to(x1, y1, x1 - rad, y1);
    pb.line_to(x0 + rad, y1);
    pb.quad_to(x0, y1, x0, y1 - rad);
    pb.line_to(x0, y0 + rad);
    pb.quad_to(x0, y0, x0 + rad, y0);
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vasex_core::{RatingState, TrialConfig};
    use vasex_experiment::{ApproxMeasure, ConfirmButton};
    use vasex_timing::ManualTimer;

    fn pixel(pm: &Pixmap, x: f32, y: f32, dpr: f32) -> tiny_skia::PremultipliedColorU8 {
        pm.pixel((x * dpr) as u32, (y * dpr) as u32).unwrap()
    }

    #[test]
    fn frame_origin_centres_the_frame() {
        let r = SkiaRenderer::new(2048, 1600, 2.0, None).unwrap();
        let layout = ViewLayout::new(&TrialConfig::default(), &ApproxMeasure);
        assert_eq!(r.frame_origin(&layout), (0.0, 0.0));
        let r = SkiaRenderer::new(1424, 900, 1.0, None).unwrap();
        assert_eq!(r.frame_origin(&layout), (200.0, 0.0));
        assert_eq!(r.to_frame(&layout, 262.0, 10.0), (62.0, 10.0));
    }

    #[test]
    fn empty_view_is_background() {
        let mut r = SkiaRenderer::new(32, 16, 1.0, None).unwrap();
        let mut fb = vec![7u8; 32 * 16 * 4];
        r.render_frame(None, &mut fb, &mut ManualTimer::new()).unwrap();
        assert!(fb.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn frame_timings_are_summarised() {
        let mut r = SkiaRenderer::new(32, 16, 1.0, None).unwrap();
        let mut fb = vec![0u8; 32 * 16 * 4];
        let mut timer = ManualTimer::new();
        for _ in 0..3 {
            r.render_frame(None, &mut fb, &mut timer).unwrap();
        }
        let summary = r.timing_summary();
        let keys: Vec<_> = summary.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["copy", "draw", "total"]);
        assert!(summary.iter().all(|(_, s)| s.samples == 3));
        assert_eq!(timer.frame_stats().samples, 3);
    }

    #[test]
    fn wrong_buffer_size_is_rejected() {
        let mut r = SkiaRenderer::new(32, 16, 1.0, None).unwrap();
        let mut fb = vec![0u8; 10];
        assert!(r.render_frame(None, &mut fb, &mut ManualTimer::new()).is_err());
    }

    #[test]
    fn button_dims_while_disabled() {
        let config = TrialConfig::default();
        let layout = ViewLayout::new(&config, &ApproxMeasure);
        let ratings = RatingState::new();
        let mut r = SkiaRenderer::new(1024, 900, 1.0, None).unwrap();

        let b = layout.button;
        let (bx, by) = (b.x + 4.0, b.y + b.height / 2.0);

        let disabled = TrialView {
            config: &config,
            layout: &layout,
            ratings: &ratings,
            button: ConfirmButton::default(),
        };
        r.draw_view(Some(&disabled)).unwrap();
        let dim = pixel(r.frame(), bx, by, 1.0);

        let mut w = vasex_experiment::VasTrialWidget::start(
            config.clone(),
            ManualTimer::new(),
            &ApproxMeasure,
            |_| {},
        )
        .unwrap();
        for line in layout.scales.lines {
            w.pointer_down(line.x1, line.y);
        }
        r.draw_view(Some(&w.view())).unwrap();
        let lit = pixel(r.frame(), bx, by, 1.0);

        assert!(dim.red() > 0);
        assert!(lit.red() > dim.red());
        assert_eq!(lit.alpha(), 255);
    }

    #[test]
    fn pressed_button_is_shaded() {
        let config = TrialConfig::default();
        let mut w = vasex_experiment::VasTrialWidget::start(
            config,
            ManualTimer::new(),
            &ApproxMeasure,
            |_| {},
        )
        .unwrap();
        let lines = w.layout().scales.lines;
        for line in lines {
            w.pointer_down(line.x1, line.y);
        }
        let b = w.layout().button;
        let (bx, by) = (b.x + 4.0, b.y + b.height / 2.0);
        let mut r = SkiaRenderer::new(1024, 900, 1.0, None).unwrap();

        r.draw_view(Some(&w.view())).unwrap();
        let idle = pixel(r.frame(), bx, by, 1.0);
        w.dispatch(vasex_experiment::PointerKind::Down, bx, by);
        r.draw_view(Some(&w.view())).unwrap();
        let pressed = pixel(r.frame(), bx, by, 1.0);

        assert_eq!(idle.red(), 239);
        assert!(pressed.red() < idle.red());
    }

    #[test]
    fn stimulus_is_contained_in_image_box() {
        let config = TrialConfig::default();
        let layout = ViewLayout::new(&config, &ApproxMeasure);
        let ratings = RatingState::new();
        let view = TrialView {
            config: &config,
            layout: &layout,
            ratings: &ratings,
            button: ConfirmButton::default(),
        };

        // 2:1 red image into a 900x520 box: 900x450, letterboxed top and bottom
        let mut img = Pixmap::new(20, 10).unwrap();
        img.fill(Color::from_rgba8(255, 0, 0, 255));
        let mut r = SkiaRenderer::new(1024, 900, 1.0, None).unwrap();
        r.set_stimulus(Some(img));
        r.draw_view(Some(&view)).unwrap();

        let ib = layout.image_box;
        let centre = pixel(r.frame(), ib.x + ib.width / 2.0, ib.y + ib.height / 2.0, 1.0);
        assert_eq!((centre.red(), centre.green()), (255, 0));
        let band = pixel(r.frame(), ib.x + ib.width / 2.0, ib.y + 10.0, 1.0);
        assert_eq!(band.red(), 0);
    }

    #[test]
    fn button_label_is_centred() {
        let Some(font) = crate::text::test_font() else { return };
        let metrics = crate::TextMetrics::from(Some(font.clone()));
        let mut w = vasex_experiment::VasTrialWidget::start(
            TrialConfig::default(),
            ManualTimer::new(),
            &metrics,
            |_| {},
        )
        .unwrap();
        let lines = w.layout().scales.lines;
        for line in lines {
            w.pointer_down(line.midpoint_x(), line.y);
        }
        let mut r = SkiaRenderer::new(1024, 900, 1.0, Some(font)).unwrap();
        r.draw_view(Some(&w.view())).unwrap();

        let layout = w.layout();
        let b = layout.button;
        // rows clear of the rounded corners
        let radius = layout.button_style.radius;
        let rows = (b.y + radius) as u32..(b.bottom() - radius) as u32;
        let ink: Vec<u32> = (b.x as u32..b.right() as u32)
            .filter(|&x| rows.clone().any(|y| r.frame().pixel(x, y).unwrap().red() < 120))
            .collect();
        assert!(!ink.is_empty());
        let ink_centre = (ink[0] + ink[ink.len() - 1]) as f32 / 2.0;
        let button_centre = b.x + b.width / 2.0;
        assert!(
            (ink_centre - button_centre).abs() <= 3.0,
            "label centre {ink_centre}, button centre {button_centre}"
        );
        assert!(ink[0] as f32 >= b.x + layout.button_style.pad_x - 3.0);
    }
}
