use thiserror::Error;

/// Reasons a [`TrialConfig`](crate::TrialConfig) cannot drive a trial.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive")]
    ZeroDimension { field: &'static str },

    #[error("scale must be a positive finite number, got {0}")]
    InvalidScale(f32),

    #[error("scale {scale} leaves no room for the rating track")]
    DegenerateTrack { scale: f32 },
}
