//! # Localisation module
//!
//! This module provides the pose types used by the autopilot. The craft's
//! attitude is reduced to a yaw angle about the nav-frame up axis, since the
//! autopilot only ever commands yaw (bank is cosmetic and pitch is owned by
//! the host's flight model).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose of the craft in the Nav Frame (NF).
///
/// The NF is a fixed local frame with X/Y forming the horizontal plane and Z
/// pointing up. Altitude is therefore the Z component of the position.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default)]
pub struct Pose {
    /// The position in the NF
    pub position_m: Vector3<f64>,

    /// The heading (angle to the positive NF_X axis about NF_Z) of the craft
    /// in radians, in the range [-pi, pi].
    pub yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Return the craft's position projected onto the horizontal plane.
    pub fn position2(&self) -> Vector2<f64> {
        self.position_m.xy()
    }

    /// Return the altitude (NF_Z) of the craft in meters.
    pub fn altitude_m(&self) -> f64 {
        self.position_m[2]
    }
}
