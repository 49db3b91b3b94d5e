pub mod config;
pub mod error;
pub mod rating;
pub mod stimulus;
pub mod trial;

pub use config::{ScaleLabels, TrialConfig};
pub use error::ConfigError;
pub use rating::{LINE_COUNT, LineRating, RatingState};
pub use stimulus::StimulusMeta;
pub use trial::{ResultRecord, TrialPhase};
