//! # Ports module
//!
//! This module defines the boundary between the autopilot and the host
//! environment which owns the physics, the scene, and the craft itself:
//!
//! - The read half of the motion port is [`TickInput`], sampled by the host
//!   and handed to the autopilot once per fixed tick.
//! - The write half is [`MotionDemand`], the fire-and-forget commands the
//!   autopilot issues back each tick.
//! - [`GroundQuery`] is the downward ray probe used for the hover-clearance
//!   floor, injected at construction.
//! - [`PathCandidate`] entries are enumerated by the host and passed in on
//!   every call that may resolve a route; the autopilot never goes looking
//!   for scene objects itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

// Internal
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Downward ground probe provided by the host environment.
pub trait GroundQuery {
    /// Cast a ray straight down from `from_m` and return the height (NF_Z)
    /// of the first surface hit within `max_range_m`, or `None` if nothing
    /// was hit in range.
    fn probe_down(&self, from_m: Vector3<f64>, max_range_m: f64) -> Option<f64>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A candidate route offered by the host environment.
///
/// Candidates carry the identification data used by the path resolver's
/// filters as well as the anchor points themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathCandidate {
    /// Name of the route, matched case-insensitively by the name filter
    pub name: String,

    /// Tag of the route, matched exactly by the tag filter
    pub tag: String,

    /// Ordered anchor points of the route in the NF
    pub points_m: Vec<Vector3<f64>>,
}

/// Per-tick sensor sample handed in by the host's fixed-step loop.
#[derive(Debug, Copy, Clone)]
pub struct TickInput {
    /// Fixed timestep of this tick in seconds
    pub dt_s: f64,

    /// Current pose of the craft
    pub pose: Pose,

    /// Current velocity of the craft in the NF
    pub velocity_ms: Vector3<f64>,

    /// Readiness flag - false if the craft cannot currently accept commands
    /// (for example while ragdolled). The autopilot freezes when this is
    /// false.
    pub drivable: bool,
}

/// Fire-and-forget motion demands for one tick.
///
/// Fields left as `None` mean "no demand on that axis this tick"; the host
/// must not treat them as zero demands.
#[derive(Debug, Default, Copy, Clone)]
pub struct MotionDemand {
    /// Horizontal acceleration demand in the NF X/Y plane
    pub accel_mss: Option<Vector2<f64>>,

    /// Vertical velocity demand, already clamped to the craft's maximum
    /// vertical speed
    pub vert_vel_ms: Option<f64>,

    /// Absolute yaw to adopt this tick, already rate limited
    pub yaw_rad: Option<f64>,

    /// Cosmetic bank angle, eased - must not feed back into control
    pub bank_rad: Option<f64>,

    /// If true the host should zero the craft's velocity (issued once on
    /// arrival when not hovering at the destination)
    pub halt: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathCandidate {
    /// Return the representative point used for nearest-start scoring.
    ///
    /// For a forward route this is the first point, for a return route the
    /// last. `None` if the candidate has no points.
    pub fn rep_point(&self, is_return: bool) -> Option<Vector3<f64>> {
        if is_return {
            self.points_m.last().copied()
        } else {
            self.points_m.first().copied()
        }
    }
}
