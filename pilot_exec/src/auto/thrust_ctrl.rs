//! # Thrust controller
//!
//! Computes the horizontal acceleration demand pushing the craft towards its
//! desired speed along the pursuit direction. The vertical axis is never
//! touched here - that is the vertical controller's exclusive
//! responsibility.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use super::nav_mgr::{Params, Phase};
use util::maths::lin_map;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fraction of the cruise speed the desired speed is floored at during
/// climb-out, so corner slowdown cannot stall the takeoff.
const TAKEOFF_SPEED_FLOOR_FRAC: f64 = 0.75;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the horizontal acceleration demand for this tick.
///
/// `flat_dist_to_final_m` is the horizontal distance from the craft to the
/// last working point, used for the landing slow-down blend.
pub fn accel_demand(
    phase: Phase,
    position2_m: Vector2<f64>,
    flat_vel_ms: Vector2<f64>,
    aim2_m: Vector2<f64>,
    corner_speed_scale: f64,
    flat_dist_to_final_m: f64,
    params: &Params,
) -> Vector2<f64> {
    let mut desired_speed_ms = params.cruise_speed_ms * corner_speed_scale;

    match phase {
        Phase::Landing => {
            // Blend down towards a creep speed proportionally to the
            // remaining distance
            if flat_dist_to_final_m < params.slow_radius_m {
                desired_speed_ms = lin_map(
                    (0.0, params.slow_radius_m),
                    (params.approach_speed_ms, desired_speed_ms),
                    flat_dist_to_final_m,
                )
                .max(params.approach_speed_ms);
            }
        }
        Phase::Takeoff => {
            desired_speed_ms =
                desired_speed_ms.max(TAKEOFF_SPEED_FLOOR_FRAC * params.cruise_speed_ms);
        }
        _ => (),
    }

    // Desired velocity points at the aim. With the aim on top of the craft
    // the desired velocity is zero and the demand just brakes.
    let to_aim = aim2_m - position2_m;
    let flat_dist_m = to_aim.norm();
    let desired_vel_ms = if flat_dist_m > f64::EPSILON {
        to_aim * (desired_speed_ms / flat_dist_m)
    } else {
        Vector2::zeros()
    };

    (desired_vel_ms - flat_vel_ms) * params.accel_gain
}
