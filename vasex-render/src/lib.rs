pub mod render;
pub mod scales;
pub mod stimulus;
pub mod text;

pub use render::{FrameStats, SkiaRenderer};
pub use scales::{backing_size, draw_scales};
pub use stimulus::{load_stimulus, pixmap_from_rgba};
pub use text::{
    Align, SYSTEM_FONTS, TextMetrics, TextPainter, load_first_font, load_font, render_text_pixmap,
};

pub use ab_glyph::FontArc;
