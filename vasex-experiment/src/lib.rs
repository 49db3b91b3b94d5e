pub mod input;
pub mod layout;
pub mod manifest;
pub mod session;
pub mod widget;

pub use input::{Commit, PointerKind, PointerState};
pub use layout::{
    ApproxMeasure, ButtonStyle, Rect, ScaleLine, ScaleLineGeometry, ScaleStyle, TextMeasure,
    ViewLayout, ViewTarget, x_to_rating,
};
pub use manifest::{
    ManifestEntry, ManifestError, build_manifest, read_manifest, sample_manifest, write_manifest,
};
pub use session::{Session, SessionEvent, shuffle_trials, trials_from_manifest};
pub use widget::{ConfirmButton, FinishCallback, TrialView, VasTrialWidget};
