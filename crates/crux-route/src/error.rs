/// Failures of bound computation and route search.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("invalid calibration: pixels per cm must be positive and finite (got {pixels_per_cm})")]
    InvalidCalibration { pixels_per_cm: f32 },

    #[error("climber height must be positive and finite (got {height_cm} cm)")]
    InvalidClimberHeight { height_cm: f32 },

    #[error("starting distance from the ground must be non-negative and finite (got {distance_cm} cm)")]
    InvalidStartingDistance { distance_cm: f32 },

    #[error("reach ratios must be positive and finite (hand={hand}, foot={foot})")]
    InvalidReachRatio { hand: f32, foot: f32 },

    #[error("invalid image size (width={width}, height={height})")]
    InvalidImageSize { width: usize, height: usize },

    #[error("no valid starting stance: {reason}")]
    NoStartingStance { reason: String },

    #[error("no ascending move exists from the starting stance")]
    NoFeasibleRoute,
}
