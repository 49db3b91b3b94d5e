use serde::{Deserialize, Serialize};

use crate::config::TrialConfig;
use crate::rating::RatingState;
use crate::stimulus::StimulusMeta;

/// Lifecycle of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    /// Rendered and accepting pointer input.
    Running,
    /// Result emitted; the trial ignores all further input.
    Complete,
}

/// Recorded result of one trial, handed to the host on confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub is_vas_response: bool,
    pub image_folder: String,
    pub image_file: String,
    pub image_id: String,
    pub library: String,
    pub stimulus: Option<String>,
    pub craving: Option<u8>,
    pub valence: Option<u8>,
    pub arousal: Option<u8>,
    /// Milliseconds from first render to confirm.
    pub rt: u64,
}

impl ResultRecord {
    /// Assembles the record from the trial inputs and final ratings.
    ///
    /// Lines are reported positionally: craving, valence, arousal. A line that
    /// was never touched is reported as `None`.
    pub fn assemble(config: &TrialConfig, ratings: &RatingState, rt: u64) -> Self {
        let meta = StimulusMeta::parse(config.stimulus.as_deref());
        let reported = |line| ratings.is_touched(line).then(|| ratings.value(line)).flatten();

        Self {
            is_vas_response: true,
            image_folder: meta.image_folder,
            image_file: meta.image_file,
            image_id: config.image_id.clone(),
            library: config.library.clone(),
            stimulus: config.stimulus.clone(),
            craving: reported(0),
            valence: reported(1),
            arousal: reported(2),
            rt,
        }
    }
}
