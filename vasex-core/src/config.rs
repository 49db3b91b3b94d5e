use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Base logical width of the scale canvas before `scale` is applied.
pub const CANVAS_BASE_WIDTH: f32 = 900.0;
/// Base logical height of the scale canvas before `scale` is applied.
pub const CANVAS_BASE_HEIGHT: f32 = 210.0;
/// Horizontal inset of each track from the canvas edges.
pub const TRACK_PADDING_X: f32 = 90.0;

/// Parameters for a single VAS trial, as supplied by the host.
///
/// Field names follow the host parameter names so a trial can be described
/// directly in JSON; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    pub stimulus: Option<String>,
    pub image_id: String,
    pub library: String,

    pub frame_width: u32,
    pub frame_height: u32,
    pub image_box_width: u32,
    pub image_box_height: u32,

    pub q1: String,
    pub q2: String,
    pub q3: String,

    pub left_label_1: String,
    pub right_label_1: String,
    pub left_label_2: String,
    pub right_label_2: String,
    pub left_label_3: String,
    pub right_label_3: String,

    pub scale: f32,
    pub button_label: String,

    /// Draw a hollow mid-scale marker on lines that have not been touched yet.
    /// Purely visual, never reported as a rating.
    pub show_placeholder: bool,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            stimulus: None,
            image_id: String::new(),
            library: String::new(),
            frame_width: 1024,
            frame_height: 768,
            image_box_width: 900,
            image_box_height: 520,
            q1: "Craving".into(),
            q2: "Valence".into(),
            q3: "Arousal".into(),
            left_label_1: "None".into(),
            right_label_1: "Strong".into(),
            left_label_2: "Unpleasant".into(),
            right_label_2: "Pleasant".into(),
            left_label_3: "Calm".into(),
            right_label_3: "Aroused".into(),
            scale: 1.0,
            button_label: "Confirm".into(),
            show_placeholder: false,
        }
    }
}

/// Title and anchor labels of one scale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleLabels<'a> {
    pub title: &'a str,
    pub left: &'a str,
    pub right: &'a str,
}

impl TrialConfig {
    /// Labels of the three lines, top to bottom.
    pub fn scales(&self) -> [ScaleLabels<'_>; 3] {
        [
            ScaleLabels {
                title: &self.q1,
                left: &self.left_label_1,
                right: &self.right_label_1,
            },
            ScaleLabels {
                title: &self.q2,
                left: &self.left_label_2,
                right: &self.right_label_2,
            },
            ScaleLabels {
                title: &self.q3,
                left: &self.left_label_3,
                right: &self.right_label_3,
            },
        ]
    }

    /// Scales a base logical length and rounds it to a whole pixel.
    pub fn px(&self, base: f32) -> f32 {
        round_half_up(base * self.scale)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims = [
            ("frame_width", self.frame_width),
            ("frame_height", self.frame_height),
            ("image_box_width", self.image_box_width),
            ("image_box_height", self.image_box_height),
        ];
        for (field, value) in dims {
            if value == 0 {
                return Err(ConfigError::ZeroDimension { field });
            }
        }

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigError::InvalidScale(self.scale));
        }

        let track = self.px(CANVAS_BASE_WIDTH) - 2.0 * self.px(TRACK_PADDING_X);
        if track <= 0.0 {
            return Err(ConfigError::DegenerateTrack { scale: self.scale });
        }

        Ok(())
    }
}

/// Rounds halves toward positive infinity, matching how layout values have
/// always been rounded by the host.
pub fn round_half_up(v: f32) -> f32 {
    (v + 0.5).floor()
}
