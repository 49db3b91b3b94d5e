use vasex_core::config::{CANVAS_BASE_HEIGHT, CANVAS_BASE_WIDTH, TRACK_PADDING_X, round_half_up};
use vasex_core::{LINE_COUNT, TrialConfig};

// Base logical metrics; every value is multiplied by `TrialConfig::scale`.
const LINE_Y: [f32; LINE_COUNT] = [45.0, 110.0, 175.0];
const HIT_TOLERANCE: f32 = 18.0;

const TITLE_X: f32 = 10.0;
const TITLE_FONT: f32 = 16.0;
const TITLE_OFFSET_Y: f32 = 12.0;
const LABEL_FONT: f32 = 12.0;
const LABEL_OFFSET_Y: f32 = 22.0;
const TICK_HALF: f32 = 8.0;
const MARKER_RADIUS: f32 = 6.0;
const TRACK_STROKE: f32 = 2.0;

const IMAGE_BOX_MARGIN_TOP: f32 = 20.0;
const CANVAS_MARGIN_TOP: f32 = 10.0;
const BUTTON_MARGIN_TOP: f32 = 10.0;
const BUTTON_FONT: f32 = 18.0;
const BUTTON_PAD_X: f32 = 18.0;
const BUTTON_PAD_Y: f32 = 8.0;
const BUTTON_RADIUS: f32 = 10.0;
const BUTTON_LINE_HEIGHT: f32 = 1.2;

/// Axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Measures rendered text so layout can size text-bearing controls.
pub trait TextMeasure {
    /// Horizontal advance of `text` at `size_px` logical pixels.
    fn advance_width(&self, text: &str, size_px: f32) -> f32;
}

/// Average-glyph estimate for when no font is loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasure;

impl TextMeasure for ApproxMeasure {
    fn advance_width(&self, text: &str, size_px: f32) -> f32 {
        text.chars().count() as f32 * size_px * 0.55
    }
}

/// Maps a horizontal position to a 0..=100 rating along `[x1, x2]`.
pub fn x_to_rating(x: f32, x1: f32, x2: f32) -> u8 {
    let span = x2 - x1;
    if span.is_nan() || span <= 0.0 {
        return 0;
    }
    let clamped = x.clamp(x1, x2);
    round_half_up(100.0 * (clamped - x1) / span).clamp(0.0, 100.0) as u8
}

/// One draggable track, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLine {
    pub y: f32,
    pub x1: f32,
    pub x2: f32,
}

impl ScaleLine {
    pub fn rating_at(&self, x: f32) -> u8 {
        x_to_rating(x, self.x1, self.x2)
    }

    pub fn marker_x(&self, rating: u8) -> f32 {
        self.x1 + f32::from(rating.min(100)) / 100.0 * (self.x2 - self.x1)
    }

    pub fn midpoint_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }
}

/// Geometry of the three tracks. Used for both drawing and hit-testing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleLineGeometry {
    pub width: f32,
    pub height: f32,
    pub lines: [ScaleLine; LINE_COUNT],
    pub tolerance: f32,
}

impl ScaleLineGeometry {
    pub fn new(config: &TrialConfig) -> Self {
        let width = config.px(CANVAS_BASE_WIDTH);
        let height = config.px(CANVAS_BASE_HEIGHT);
        let pad = config.px(TRACK_PADDING_X);
        let lines = LINE_Y.map(|y| ScaleLine {
            y: config.px(y),
            x1: pad,
            x2: width - pad,
        });

        Self {
            width,
            height,
            lines,
            tolerance: config.px(HIT_TOLERANCE),
        }
    }

    /// Nearest line to `y`, if it lies within the hit tolerance.
    /// Ties go to the upper line.
    pub fn hit_line(&self, y: f32) -> Option<usize> {
        let (best, dist) = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| (i, (y - line.y).abs()))
            .fold((0, f32::INFINITY), |acc, cur| if cur.1 < acc.1 { cur } else { acc });

        (dist <= self.tolerance).then_some(best)
    }
}

/// Scaled drawing metrics of the scale canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleStyle {
    pub title_x: f32,
    pub title_font: f32,
    pub title_offset_y: f32,
    pub label_font: f32,
    pub label_offset_y: f32,
    pub tick_half: f32,
    pub marker_radius: f32,
    pub stroke_width: f32,
}

impl ScaleStyle {
    pub fn new(config: &TrialConfig) -> Self {
        Self {
            title_x: TITLE_X,
            title_font: config.px(TITLE_FONT),
            title_offset_y: config.px(TITLE_OFFSET_Y),
            label_font: config.px(LABEL_FONT),
            label_offset_y: config.px(LABEL_OFFSET_Y),
            tick_half: config.px(TICK_HALF),
            marker_radius: config.px(MARKER_RADIUS),
            stroke_width: config.px(TRACK_STROKE).max(2.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonStyle {
    pub font: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub radius: f32,
}

/// Where a point in frame coordinates lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewTarget {
    /// Inside the scale canvas, with canvas-local coordinates.
    Canvas { x: f32, y: f32 },
    Button,
    Outside,
}

/// Placement of the trial's elements, in logical pixels relative to the
/// top-left corner of the frame.
///
/// The frame is a centred column: image box, scale canvas, confirm button.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewLayout {
    pub frame: Rect,
    pub image_box: Rect,
    pub canvas: Rect,
    pub button: Rect,
    pub scales: ScaleLineGeometry,
    pub scale_style: ScaleStyle,
    pub button_style: ButtonStyle,
}

impl ViewLayout {
    pub fn new(config: &TrialConfig, measure: &dyn TextMeasure) -> Self {
        let frame_w = config.px(config.frame_width as f32);
        let frame_h = config.px(config.frame_height as f32);
        let centred_x = |w: f32| ((frame_w - w) / 2.0).floor();

        let box_w = config.px(config.image_box_width as f32);
        let box_h = config.px(config.image_box_height as f32);
        let image_box = Rect::new(
            centred_x(box_w),
            config.px(IMAGE_BOX_MARGIN_TOP),
            box_w,
            box_h,
        );

        let scales = ScaleLineGeometry::new(config);
        let canvas = Rect::new(
            centred_x(scales.width),
            image_box.bottom() + config.px(CANVAS_MARGIN_TOP),
            scales.width,
            scales.height,
        );

        let button_style = ButtonStyle {
            font: config.px(BUTTON_FONT),
            pad_x: config.px(BUTTON_PAD_X),
            pad_y: config.px(BUTTON_PAD_Y),
            radius: config.px(BUTTON_RADIUS),
        };
        let text_w = measure
            .advance_width(&config.button_label, button_style.font)
            .ceil();
        let button_w = text_w + 2.0 * button_style.pad_x;
        let button_h =
            round_half_up(button_style.font * BUTTON_LINE_HEIGHT) + 2.0 * button_style.pad_y;
        let button = Rect::new(
            centred_x(button_w),
            canvas.bottom() + config.px(BUTTON_MARGIN_TOP),
            button_w,
            button_h,
        );

        Self {
            frame: Rect::new(0.0, 0.0, frame_w, frame_h),
            image_box,
            canvas,
            button,
            scales,
            scale_style: ScaleStyle::new(config),
            button_style,
        }
    }

    /// Routes a frame-space point to the element under it.
    pub fn target(&self, x: f32, y: f32) -> ViewTarget {
        if self.button.contains(x, y) {
            ViewTarget::Button
        } else if self.canvas.contains(x, y) {
            let (cx, cy) = self.to_canvas(x, y);
            ViewTarget::Canvas { x: cx, y: cy }
        } else {
            ViewTarget::Outside
        }
    }

    /// Converts frame coordinates to canvas coordinates without bounds checks.
    pub fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.canvas.x, y - self.canvas.y)
    }
}
