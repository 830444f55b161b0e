//! Deterministic ascent search over registered holds.
//!
//! The search picks a starting stance near the ground, then repeatedly moves
//! one limb to a higher hold, always taking the move that raises the center
//! of mass the most. Ties are broken by lateral drift from the starting
//! stance, then hold id, then limb order, so the same inputs always produce
//! the same route.

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::distance;
use serde::{Deserialize, Serialize};

use crate::{
    ClimberState, Hold, HoldRegistry, Limb, LimbPlacement, ReachBounds, Route, RouteError,
    RouteOutcome,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Where the floor is in the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundLine {
    /// The last image row.
    #[default]
    ImageBottom,
    /// An explicit image row, e.g. the bottom edge of a marker on the floor.
    Baseline(f32),
}

impl GroundLine {
    #[inline]
    pub fn y(self, image_height: usize) -> f32 {
        match self {
            GroundLine::ImageBottom => image_height as f32,
            GroundLine::Baseline(y) => y,
        }
    }
}

/// Height a foot's target hold is compared against during ascent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootReference {
    /// Feet move above the center of mass, like hands.
    #[default]
    CenterOfMass,
    /// Feet only have to climb above their own current hold. A free foot
    /// falls back to the center of mass.
    CurrentHold,
}

/// Route search configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSearchParams {
    pub ground: GroundLine,
    /// Limbs the starting stance must place, clamped to `1..=4`.
    pub min_limbs_per_stance: usize,
    /// Downward slack when comparing a target hold to the limb's reference height.
    pub lag_tolerance_px: f32,
    pub foot_reference: FootReference,
    /// The route succeeds once the center of mass is within this fraction of
    /// the image height from the top.
    pub top_margin_fraction: f32,
    /// Upper bound on moves after the starting stance.
    pub max_steps: usize,
    /// Dead ends that may be undone to try the next-best move.
    pub backtrack_budget: usize,
}

impl Default for RouteSearchParams {
    fn default() -> Self {
        Self {
            ground: GroundLine::ImageBottom,
            min_limbs_per_stance: 2,
            lag_tolerance_px: 0.0,
            foot_reference: FootReference::CenterOfMass,
            top_margin_fraction: 0.15,
            max_steps: 256,
            backtrack_budget: 0,
        }
    }
}

/// Route generator for one configuration.
#[derive(Clone, Debug, Default)]
pub struct RouteSearch {
    params: RouteSearchParams,
}

impl RouteSearch {
    pub fn new(params: RouteSearchParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RouteSearchParams {
        &self.params
    }

    /// Generate a route over `registry` on an image of the given size.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, registry, bounds), fields(holds = registry.len()))
    )]
    pub fn generate_route(
        &self,
        registry: &HoldRegistry,
        bounds: &ReachBounds,
        image_width: usize,
        image_height: usize,
    ) -> Result<Route, RouteError> {
        if image_width == 0 || image_height == 0 {
            return Err(RouteError::InvalidImageSize {
                width: image_width,
                height: image_height,
            });
        }

        let start = self.starting_stance(registry, bounds, image_width, image_height)?;
        let top_y = image_height as f32 * self.params.top_margin_fraction;
        let reached = |s: &ClimberState| s.height_rank() <= top_y;

        log::debug!(
            "starting stance with {} limbs, center of mass {:?}",
            start.limb_count(),
            start.center_of_mass
        );
        if reached(&start) {
            return Ok(Route {
                states: vec![start],
                outcome: RouteOutcome::ReachedTop,
            });
        }

        let ctx = SearchContext {
            registry,
            bounds,
            tree: registry.spatial_index(),
            lag_tolerance_px: self.params.lag_tolerance_px,
            foot_reference: self.params.foot_reference,
            start_x: start.center_of_mass.x,
        };

        let mut path = vec![start];
        let mut frames = vec![Frame {
            moves: ctx.moves(&path),
            next: 0,
        }];
        let mut best = path.clone();
        let mut budget = self.params.backtrack_budget;

        loop {
            let can_step = path.len() - 1 < self.params.max_steps;
            let next = frames.last_mut().and_then(|f| {
                let mv = f.moves.get(f.next).filter(|_| can_step).cloned();
                f.next += 1;
                mv
            });

            if let Some(mv) = next {
                log::trace!(
                    "step {}: {:?} -> hold {} (+{:.1} px)",
                    path.len(),
                    mv.limb,
                    mv.hold,
                    mv.progress
                );
                path.push(mv.state);
                if path.last().is_some_and(reached) {
                    log::info!("route reached the top in {} moves", path.len() - 1);
                    return Ok(Route {
                        states: path,
                        outcome: RouteOutcome::ReachedTop,
                    });
                }
                frames.push(Frame {
                    moves: ctx.moves(&path),
                    next: 0,
                });
                continue;
            }

            if is_higher(&path, &best) {
                best = path.clone();
            }
            if budget == 0 || path.len() <= 1 {
                break;
            }
            budget -= 1;
            path.pop();
            frames.pop();
        }

        if best.len() <= 1 {
            return Err(RouteError::NoFeasibleRoute);
        }
        log::info!("route stopped below the top after {} moves", best.len() - 1);
        Ok(Route {
            states: best,
            outcome: RouteOutcome::HighestFeasible,
        })
    }

    fn starting_stance(
        &self,
        registry: &HoldRegistry,
        bounds: &ReachBounds,
        image_width: usize,
        image_height: usize,
    ) -> Result<ClimberState, RouteError> {
        let ground_y = self.params.ground.y(image_height);
        let envelope: Vec<&Hold> = registry
            .iter()
            .filter(|h| ground_y - h.center.y <= bounds.starting_envelope_max_px)
            .collect();
        if envelope.len() < 2 {
            return Err(no_stance(format!(
                "{} hold(s) within {:.0} px of the ground",
                envelope.len(),
                bounds.starting_envelope_max_px
            )));
        }

        let center_x = image_width as f32 * 0.5;
        let foot_rank = |h: &Hold| (ground_y - h.center.y) + (h.center.x - center_x).abs();
        let mut feet: Vec<&Hold> = envelope
            .iter()
            .copied()
            .filter(|h| h.role.allows_foot())
            .collect();
        feet.sort_by(|a, b| {
            foot_rank(a)
                .total_cmp(&foot_rank(b))
                .then(a.id.cmp(&b.id))
        });
        let Some((&first, rest)) = feet.split_first() else {
            return Err(no_stance("no foot hold near the ground".to_string()));
        };
        let second = rest
            .iter()
            .copied()
            .find(|h| distance(&h.center, &first.center) <= 2.0 * bounds.max_foot_reach_px);

        let feet_mid = match second {
            Some(s) => nalgebra::center(&first.center, &s.center),
            None => first.center,
        };
        let used = |id: usize| id == first.id || second.is_some_and(|s| s.id == id);
        let mut hands: Vec<(&Hold, f32)> = envelope
            .iter()
            .copied()
            .filter(|h| h.role.allows_hand() && !used(h.id) && h.center.y < feet_mid.y)
            .map(|h| (h, distance(&h.center, &feet_mid)))
            .filter(|(_, d)| *d <= bounds.max_hand_reach_px)
            .collect();
        hands.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.id.cmp(&b.0.id)));

        let mut limbs = [None; 4];
        let (left_foot, right_foot) = left_right(first, second, center_x);
        let (left_hand, right_hand) = left_right_of(&hands, feet_mid.x);
        limbs[Limb::LeftFoot.index()] = left_foot.map(placement);
        limbs[Limb::RightFoot.index()] = right_foot.map(placement);
        limbs[Limb::LeftHand.index()] = left_hand.map(placement);
        limbs[Limb::RightHand.index()] = right_hand.map(placement);

        let placed = limbs.iter().flatten().count();
        let required = self.params.min_limbs_per_stance.clamp(1, 4);
        if placed < required {
            return Err(no_stance(format!(
                "only {placed} limb(s) can be placed, {required} required"
            )));
        }
        ClimberState::from_limbs(limbs).ok_or_else(|| no_stance("no limb placed".to_string()))
    }
}

fn no_stance(reason: String) -> RouteError {
    RouteError::NoStartingStance { reason }
}

fn placement(hold: &Hold) -> LimbPlacement {
    LimbPlacement {
        hold: hold.id,
        position: hold.center,
    }
}

/// Split one or two holds into (left, right). A lone hold goes left when it
/// is at or left of `pivot_x`.
fn left_right<'a>(
    a: &'a Hold,
    b: Option<&'a Hold>,
    pivot_x: f32,
) -> (Option<&'a Hold>, Option<&'a Hold>) {
    match b {
        Some(b) => {
            let a_left = a
                .center
                .x
                .total_cmp(&b.center.x)
                .then(a.id.cmp(&b.id))
                .is_le();
            if a_left {
                (Some(a), Some(b))
            } else {
                (Some(b), Some(a))
            }
        }
        None if a.center.x <= pivot_x => (Some(a), None),
        None => (None, Some(a)),
    }
}

fn left_right_of<'a>(
    ranked: &[(&'a Hold, f32)],
    pivot_x: f32,
) -> (Option<&'a Hold>, Option<&'a Hold>) {
    match ranked {
        [] => (None, None),
        [(a, _)] => left_right(*a, None, pivot_x),
        [(a, _), (b, _), ..] => left_right(*a, Some(*b), pivot_x),
    }
}

fn is_higher(path: &[ClimberState], than: &[ClimberState]) -> bool {
    match (path.last(), than.last()) {
        (Some(p), Some(t)) => p.height_rank() < t.height_rank(),
        (Some(_), None) => true,
        _ => false,
    }
}

#[derive(Clone, Debug)]
struct Move {
    limb: Limb,
    hold: usize,
    progress: f32,
    drift: f32,
    state: ClimberState,
}

struct Frame {
    moves: Vec<Move>,
    next: usize,
}

struct SearchContext<'a> {
    registry: &'a HoldRegistry,
    bounds: &'a ReachBounds,
    tree: KdTree<f32, 2>,
    lag_tolerance_px: f32,
    foot_reference: FootReference,
    start_x: f32,
}

impl SearchContext<'_> {
    /// Ranked single-limb moves from the last state of `path`.
    fn moves(&self, path: &[ClimberState]) -> Vec<Move> {
        let Some((current, before)) = path.split_last() else {
            return Vec::new();
        };
        let recent = &before[before.len().saturating_sub(2)..];
        let com = current.center_of_mass;
        let mut out = Vec::new();

        for limb in Limb::ALL {
            let reach = self.bounds.reach_for(limb);
            let mut nearby: Vec<usize> = self
                .tree
                .within::<SquaredEuclidean>(&[com.x, com.y], reach * reach)
                .iter()
                .map(|n| n.item as usize)
                .collect();
            nearby.sort_unstable();

            let reference_y = match self.foot_reference {
                FootReference::CurrentHold if !limb.is_hand() => {
                    current.limb(limb).map_or(com.y, |p| p.position.y)
                }
                _ => com.y,
            };

            for id in nearby {
                let Some(hold) = self.registry.get(id) else {
                    continue;
                };
                if current.limb_on(id).is_some()
                    || recent
                        .iter()
                        .any(|s| s.limb(limb).is_some_and(|p| p.hold == id))
                    || !limb.accepts(hold.role)
                    || hold.center.y >= reference_y + self.lag_tolerance_px
                {
                    continue;
                }

                let state = current.with_limb(limb, placement(hold));
                let progress = com.y - state.center_of_mass.y;
                if progress <= 0.0 || !self.within_reach(&state) {
                    continue;
                }
                out.push(Move {
                    limb,
                    hold: id,
                    progress,
                    drift: (state.center_of_mass.x - self.start_x).abs(),
                    state,
                });
            }
        }

        out.sort_by(|a, b| {
            b.progress
                .total_cmp(&a.progress)
                .then(a.drift.total_cmp(&b.drift))
                .then(a.hold.cmp(&b.hold))
                .then(a.limb.cmp(&b.limb))
        });
        out
    }

    fn within_reach(&self, state: &ClimberState) -> bool {
        state
            .occupied()
            .all(|(limb, _)| state.distance_to_com(limb) <= Some(self.bounds.reach_for(limb)))
    }
}
