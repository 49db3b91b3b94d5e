use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};
use vasex_experiment::TrialView;

use crate::text::{Align, TextPainter};

const INK: Color = Color::WHITE;

fn placeholder_ink() -> Color {
    Color::from_rgba8(136, 136, 136, 255)
}

/// Backing size in device pixels for a logical canvas size.
pub fn backing_size(width: f32, height: f32, dpr: f32) -> (u32, u32) {
    (
        (width * dpr).round().max(1.0) as u32,
        (height * dpr).round().max(1.0) as u32,
    )
}

/// Draws the three scale lines of `view` onto `canvas`.
///
/// The whole surface is cleared first, so the result depends only on the
/// arguments. `canvas` is expected to be the backing pixmap of the logical
/// canvas at `dpr` device pixels per logical pixel.
pub fn draw_scales(canvas: &mut Pixmap, view: &TrialView<'_>, dpr: f32, text: &mut TextPainter) {
    canvas.fill(Color::TRANSPARENT);

    let transform = Transform::from_scale(dpr, dpr);
    let style = &view.layout.scale_style;
    let geometry = &view.layout.scales;

    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.set_color(INK);

    let stroke = Stroke {
        width: style.stroke_width,
        ..Stroke::default()
    };

    for ((line, labels), rating) in geometry
        .lines
        .iter()
        .zip(view.config.scales())
        .zip(view.ratings.lines())
    {
        let y = line.y;

        text.draw(
            canvas,
            labels.title,
            style.title_font,
            style.title_x,
            y - style.title_offset_y,
            Align::Left,
            INK,
            dpr,
        );

        let mut pb = PathBuilder::new();
        pb.move_to(line.x1, y);
        pb.line_to(line.x2, y);
        pb.move_to(line.x1, y - style.tick_half);
        pb.line_to(line.x1, y + style.tick_half);
        pb.move_to(line.x2, y - style.tick_half);
        pb.line_to(line.x2, y + style.tick_half);
        if let Some(path) = pb.finish() {
            canvas.stroke_path(&path, &paint, &stroke, transform, None);
        }

        let label_y = y + style.label_offset_y;
        text.draw(
            canvas,
            labels.left,
            style.label_font,
            line.x1,
            label_y,
            Align::Left,
            INK,
            dpr,
        );
        text.draw(
            canvas,
            labels.right,
            style.label_font,
            line.x2,
            label_y,
            Align::Right,
            INK,
            dpr,
        );

        match (rating.touched, rating.value) {
            (true, Some(value)) => {
                if let Some(dot) = PathBuilder::from_circle(line.marker_x(value), y, style.marker_radius) {
                    canvas.fill_path(&dot, &paint, FillRule::Winding, transform, None);
                }
            }
            _ if view.config.show_placeholder => {
                let mut ghost = Paint::default();
                ghost.anti_alias = true;
                ghost.set_color(placeholder_ink());
                let ring = Stroke {
                    width: (style.stroke_width / 2.0).max(1.0),
                    ..Stroke::default()
                };
                if let Some(circle) =
                    PathBuilder::from_circle(line.midpoint_x(), y, style.marker_radius)
                {
                    canvas.stroke_path(&circle, &ghost, &ring, transform, None);
                }
            }
            _ => {}
        }
    }
}
