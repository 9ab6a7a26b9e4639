//! # Heading controller
//!
//! Turns the craft's yaw towards the pursuit aim point at a bounded angular
//! rate, and derives a cosmetic bank angle from the turn demand. The bank
//! angle is purely visual and must never feed back into the control loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::nav_mgr::Params;
use crate::loc::Pose;
use nalgebra::Vector3;
use util::maths::{ang_delta, clamp01, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum squared horizontal distance to the aim point below which no
/// heading demand is produced (guards the atan2 at zero distance).
const FLAT_EPS_M2: f64 = 1e-6;

/// Rate at which the cosmetic bank angle eases towards its target, in 1/s.
const BANK_EASE_HZ: f64 = 4.0;

/// The bank target is the heading error divided by this factor, before
/// clamping to the bank limit.
const BANK_ERROR_DIVISOR: f64 = 4.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The heading controller state.
#[derive(Debug, Default, Clone)]
pub struct HeadCtrl {
    /// Current eased bank angle
    bank_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadCtrl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the eased bank back to level.
    pub fn reset(&mut self) {
        self.bank_rad = 0.0;
    }

    /// Compute the yaw and bank demands for this tick.
    ///
    /// Returns `None` when the aim point is (horizontally) on top of the
    /// craft, in which case the previous heading is simply kept.
    pub fn step(
        &mut self,
        pose: &Pose,
        aim_m: Vector3<f64>,
        dt_s: f64,
        params: &Params,
    ) -> Option<(f64, f64)> {
        let flat = aim_m.xy() - pose.position2();
        if flat.norm_squared() < FLAT_EPS_M2 {
            return None;
        }

        let target_yaw_rad = flat[1].atan2(flat[0]);
        let err_rad = ang_delta(pose.yaw_rad, target_yaw_rad);

        // Angle-clamped step, not an instantaneous snap
        let max_step_rad = params.yaw_rate_degs.to_radians() * dt_s;
        let yaw_rad = wrap_pi(pose.yaw_rad + err_rad.clamp(-max_step_rad, max_step_rad));

        // Cosmetic bank, eased towards a fraction of the heading error
        let bank_limit_rad = params.bank_limit_deg.to_radians();
        let bank_target_rad = (err_rad / BANK_ERROR_DIVISOR).clamp(-bank_limit_rad, bank_limit_rad);
        self.bank_rad += (bank_target_rad - self.bank_rad) * clamp01(dt_s * BANK_EASE_HZ);

        Some((yaw_rad, self.bank_rad))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn test_params() -> Params {
        let mut p = Params::default();
        p.yaw_rate_degs = 90.0;
        p.bank_limit_deg = 20.0;
        p
    }

    fn pose_at_origin(yaw_rad: f64) -> Pose {
        Pose {
            position_m: Vector3::zeros(),
            yaw_rad,
        }
    }

    #[test]
    fn test_yaw_step_is_rate_limited() {
        let params = test_params();
        let mut ctrl = HeadCtrl::new();

        // Aim directly behind the craft: a full pi error, but only
        // yaw_rate * dt of it may be taken this tick
        let pose = pose_at_origin(0.0);
        let (yaw, _) = ctrl
            .step(&pose, Vector3::new(-10.0, 1e-9, 0.0), 0.1, &params)
            .unwrap();
        assert!(yaw.abs() <= 90f64.to_radians() * 0.1 + 1e-12);
        assert!(yaw != 0.0);
    }

    #[test]
    fn test_small_error_taken_fully() {
        let params = test_params();
        let mut ctrl = HeadCtrl::new();

        // 45 degrees to the left, with a whole second to turn
        let pose = pose_at_origin(0.0);
        let (yaw, _) = ctrl
            .step(&pose, Vector3::new(10.0, 10.0, 0.0), 1.0, &params)
            .unwrap();
        assert!((yaw - FRAC_PI_2 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_distance_skipped() {
        let params = test_params();
        let mut ctrl = HeadCtrl::new();

        // Aim directly above the craft: no heading demand
        let pose = pose_at_origin(1.0);
        assert!(ctrl
            .step(&pose, Vector3::new(0.0, 0.0, 50.0), 0.1, &params)
            .is_none());
    }

    #[test]
    fn test_bank_bounded_and_eased() {
        let params = test_params();
        let mut ctrl = HeadCtrl::new();
        let bank_limit_rad = params.bank_limit_deg.to_radians();

        let mut prev_bank = 0.0;
        for _ in 0..100 {
            // Keep the error at pi by aiming behind a craft that we pretend
            // never turns
            let pose = pose_at_origin(0.0);
            let (_, bank) = ctrl
                .step(&pose, Vector3::new(-10.0, 1e-9, 0.0), 0.05, &params)
                .unwrap();

            assert!(bank.abs() <= bank_limit_rad + 1e-12);
            // Eased, so the bank moves gradually towards the limit
            assert!(bank >= prev_bank);
            prev_bank = bank;
        }

        // pi/4 error target is above the 20 degree limit, so the eased bank
        // should settle at the limit
        assert!((prev_bank - bank_limit_rad).abs() < 1e-3);
    }

    #[test]
    fn test_yaw_wraps() {
        let params = test_params();
        let mut ctrl = HeadCtrl::new();

        // Craft facing just short of pi, aim further anticlockwise - the
        // result must wrap into [-pi, pi]
        let pose = pose_at_origin(PI - 0.01);
        let (yaw, _) = ctrl
            .step(&pose, Vector3::new(-10.0, -0.5, 0.0), 1.0, &params)
            .unwrap();
        assert!(yaw >= -PI && yaw <= PI);
    }
}
