use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::HoldRole;

/// The four limbs, in ranking order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limb {
    LeftHand,
    RightHand,
    LeftFoot,
    RightFoot,
}

impl Limb {
    pub const ALL: [Limb; 4] = [
        Limb::LeftHand,
        Limb::RightHand,
        Limb::LeftFoot,
        Limb::RightFoot,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_hand(self) -> bool {
        matches!(self, Limb::LeftHand | Limb::RightHand)
    }

    #[inline]
    pub fn accepts(self, role: HoldRole) -> bool {
        if self.is_hand() {
            role.allows_hand()
        } else {
            role.allows_foot()
        }
    }
}

/// A limb resting on a hold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimbPlacement {
    pub hold: usize,
    pub position: Point2<f32>,
}

/// One body configuration: up to four placed limbs and their mean position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimberState {
    /// Indexed by [`Limb::index`].
    pub limbs: [Option<LimbPlacement>; 4],
    pub center_of_mass: Point2<f32>,
}

impl ClimberState {
    /// Build a state; `None` when no limb is placed.
    pub fn from_limbs(limbs: [Option<LimbPlacement>; 4]) -> Option<Self> {
        let placed: Vec<Point2<f32>> = limbs.iter().flatten().map(|p| p.position).collect();
        if placed.is_empty() {
            return None;
        }
        let n = placed.len() as f32;
        let sum = placed
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Some(Self {
            limbs,
            center_of_mass: Point2::from(sum / n),
        })
    }

    #[inline]
    pub fn limb(&self, limb: Limb) -> Option<LimbPlacement> {
        self.limbs[limb.index()]
    }

    pub fn occupied(&self) -> impl Iterator<Item = (Limb, LimbPlacement)> + '_ {
        Limb::ALL
            .into_iter()
            .filter_map(|l| self.limb(l).map(|p| (l, p)))
    }

    pub fn limb_count(&self) -> usize {
        self.limbs.iter().flatten().count()
    }

    /// Limb currently on `hold`, if any.
    pub fn limb_on(&self, hold: usize) -> Option<Limb> {
        self.occupied().find(|(_, p)| p.hold == hold).map(|(l, _)| l)
    }

    /// Distance from a placed limb to the center of mass.
    pub fn distance_to_com(&self, limb: Limb) -> Option<f32> {
        self.limb(limb)
            .map(|p| nalgebra::distance(&p.position, &self.center_of_mass))
    }

    /// Smaller is higher on the wall.
    #[inline]
    pub fn height_rank(&self) -> f32 {
        self.center_of_mass.y
    }

    /// Copy with `limb` moved onto a hold.
    pub fn with_limb(&self, limb: Limb, placement: LimbPlacement) -> Self {
        let mut limbs = self.limbs;
        limbs[limb.index()] = Some(placement);
        // at least one limb is placed, so the state is never empty
        Self::from_limbs(limbs).unwrap_or_else(|| self.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteOutcome {
    /// The center of mass entered the top band of the wall.
    ReachedTop,
    /// The search ran out of ascending moves below the top band.
    HighestFeasible,
}

/// An ordered ascent, starting stance first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub states: Vec<ClimberState>,
    pub outcome: RouteOutcome,
}

impl Route {
    /// Number of moves after the starting stance.
    #[inline]
    pub fn steps(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    #[inline]
    pub fn start(&self) -> Option<&ClimberState> {
        self.states.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&ClimberState> {
        self.states.last()
    }
}
