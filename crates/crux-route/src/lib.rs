//! Route generation over detected climbing holds.
//!
//! Three pieces, used in order:
//! - [`HoldRegistry`]: filtered, indexed holds from raw detector boxes,
//! - [`compute_bounds`]: climber reach in pixels from height and image scale,
//! - [`RouteSearch`]: starting stance plus a greedy, deterministic ascent.
//!
//! All coordinates are image pixels with y pointing down, so "higher on the
//! wall" means a smaller y.

mod error;
pub mod reach;
pub mod registry;
pub mod search;
mod state;

pub use error::RouteError;
pub use reach::{compute_bounds, ReachBounds, ReachParams};
pub use registry::{Hold, HoldFilter, HoldRegistry, HoldRole, RawDetection};
pub use search::{FootReference, GroundLine, RouteSearch, RouteSearchParams};
pub use state::{ClimberState, Limb, LimbPlacement, Route, RouteOutcome};
