//! Climber reach limits in image pixels.

use serde::{Deserialize, Serialize};

use crate::{Limb, RouteError};

/// Anthropometric ratios relating limb reach to body height.
///
/// Reach is measured from the center of mass, so the defaults are roughly
/// half the height for hands and a little less for feet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachParams {
    pub hand_reach_ratio: f32,
    pub foot_reach_ratio: f32,
}

impl Default for ReachParams {
    fn default() -> Self {
        Self {
            hand_reach_ratio: 0.5,
            foot_reach_ratio: 0.4,
        }
    }
}

/// Reach limits for one climber on one calibrated image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReachBounds {
    pub pixels_per_cm: f32,
    pub max_hand_reach_px: f32,
    pub max_foot_reach_px: f32,
    /// Highest a starting hold may sit above the ground line.
    pub starting_envelope_max_px: f32,
}

impl ReachBounds {
    #[inline]
    pub fn reach_for(&self, limb: Limb) -> f32 {
        if limb.is_hand() {
            self.max_hand_reach_px
        } else {
            self.max_foot_reach_px
        }
    }
}

/// Convert a climber's height and the starting-hold limit into pixel bounds.
pub fn compute_bounds(
    climber_height_cm: f32,
    pixels_per_cm: f32,
    starting_max_distance_from_ground_cm: f32,
    params: &ReachParams,
) -> Result<ReachBounds, RouteError> {
    if !pixels_per_cm.is_finite() || pixels_per_cm <= 0.0 {
        return Err(RouteError::InvalidCalibration { pixels_per_cm });
    }
    if !climber_height_cm.is_finite() || climber_height_cm <= 0.0 {
        return Err(RouteError::InvalidClimberHeight {
            height_cm: climber_height_cm,
        });
    }
    let start = starting_max_distance_from_ground_cm;
    if !start.is_finite() || start < 0.0 {
        return Err(RouteError::InvalidStartingDistance { distance_cm: start });
    }
    let (hand, foot) = (params.hand_reach_ratio, params.foot_reach_ratio);
    if !(hand.is_finite() && foot.is_finite() && hand > 0.0 && foot > 0.0) {
        return Err(RouteError::InvalidReachRatio { hand, foot });
    }

    let height_px = climber_height_cm * pixels_per_cm;
    Ok(ReachBounds {
        pixels_per_cm,
        max_hand_reach_px: height_px * hand,
        max_foot_reach_px: height_px * foot,
        starting_envelope_max_px: start * pixels_per_cm,
    })
}
