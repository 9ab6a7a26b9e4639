//! # Vertical controller
//!
//! This module provides the PID altitude controller. The raw phase-specific
//! altitude target is first smoothed (an exponential blend normalised to a
//! 60 Hz reference so behaviour is stable across tick rates), optionally
//! rate limited, and floor-clamped against the downward ground probe so the
//! craft is never commanded below safe hover clearance. The PID output is
//! added to the current vertical velocity and saturated at the craft's
//! maximum vertical speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::nav_mgr::Params;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Reference tick rate the altitude smoothing factor is expressed at.
const SMOOTH_REFERENCE_HZ: f64 = 60.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: f64,

    /// The integral accumulation
    integral: f64,
}

/// The vertical (altitude) controller.
#[derive(Debug, Serialize, Clone)]
pub struct VertCtrl {
    /// Altitude error controller
    pid: PidController,

    /// Smoothed altitude target. `None` until the first use after a reset,
    /// at which point it is primed from the craft's current altitude - this
    /// sentinel is what keeps an uninitialised target from ever feeding NaN
    /// into the PID loop.
    smoothed_target_m: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            prev_error: 0.0,
            integral: 0.0,
        }
    }

    /// Get the value of the controller for the given error and timestep.
    pub fn update(&mut self, error: f64, dt_s: f64) -> f64 {
        // With no time elapsed there is nothing to integrate or
        // differentiate, fall back on the proportional term alone
        if dt_s <= f64::EPSILON {
            return self.k_p * error;
        }

        self.integral += error * dt_s;
        let deriv = (error - self.prev_error) / dt_s;
        self.prev_error = error;

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }

    /// Zero the integral accumulation and previous error.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }
}

impl VertCtrl {
    /// Create a new vertical controller from the navigation parameters.
    pub fn new(params: &Params) -> Self {
        Self {
            pid: PidController::new(params.vert_k_p, params.vert_k_i, params.vert_k_d),
            smoothed_target_m: None,
        }
    }

    /// Reset the PID state and drop the smoothed target, re-priming it from
    /// the craft's altitude on the next step.
    pub fn reset(&mut self) {
        self.pid.reset();
        self.smoothed_target_m = None;
    }

    /// The current smoothed altitude target, if one has been primed.
    pub fn smoothed_target_m(&self) -> Option<f64> {
        self.smoothed_target_m
    }

    /// Compute the vertical velocity demand for this tick.
    ///
    /// `ground_hit_m` is the height of the surface under the craft from the
    /// downward probe, if it hit anything in range. The returned demand is
    /// clamped to the craft's maximum vertical speed.
    pub fn step(
        &mut self,
        raw_target_m: f64,
        current_alt_m: f64,
        vert_vel_ms: f64,
        ground_hit_m: Option<f64>,
        dt_s: f64,
        params: &Params,
    ) -> f64 {
        let target_m =
            self.smooth_altitude_target(raw_target_m, current_alt_m, ground_hit_m, dt_s, params);

        let error_m = target_m - current_alt_m;
        let cmd_ms = self.pid.update(error_m, dt_s);

        (vert_vel_ms + cmd_ms).clamp(-params.max_vert_speed_ms, params.max_vert_speed_ms)
    }

    /// Smooth, rate limit, and floor-clamp the raw altitude target.
    fn smooth_altitude_target(
        &mut self,
        raw_target_m: f64,
        current_alt_m: f64,
        ground_hit_m: Option<f64>,
        dt_s: f64,
        params: &Params,
    ) -> f64 {
        // Lazily prime from the current altitude, also recovering from a
        // non-finite stored value
        let prev_m = match self.smoothed_target_m {
            Some(s) if s.is_finite() => s,
            _ => current_alt_m,
        };

        // Exponential blend normalised to the 60 Hz reference rate
        let factor = 1.0 - (1.0 - params.alt_smooth_factor).powf(dt_s * SMOOTH_REFERENCE_HZ);
        let mut target_m = prev_m + (raw_target_m - prev_m) * factor;

        // Optional limit on how fast the target may move
        if params.max_alt_rate_ms > 0.0 {
            let max_step_m = params.max_alt_rate_ms * dt_s;
            target_m = prev_m + (target_m - prev_m).clamp(-max_step_m, max_step_m);
        }

        // Never command the craft below hover clearance of the ground. A
        // probe miss skips the clamp for this tick, no fallback height is
        // invented.
        if let Some(ground_m) = ground_hit_m {
            target_m = target_m.max(ground_m + params.hover_height_m);
        }

        self.smoothed_target_m = Some(target_m);
        target_m
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_params() -> Params {
        let mut p = Params::default();
        p.vert_k_p = 2.0;
        p.vert_k_i = 0.0;
        p.vert_k_d = 1.0;
        p.max_vert_speed_ms = 5.0;
        p.alt_smooth_factor = 0.15;
        p.max_alt_rate_ms = 0.0;
        p.hover_height_m = 2.0;
        p
    }

    #[test]
    fn test_demand_never_exceeds_max_vert_speed() {
        let params = test_params();
        let mut ctrl = VertCtrl::new(&params);

        // Closed loop against a craft whose vertical velocity tracks the
        // demand exactly, with a 100 m step change in target
        let dt_s = 1.0 / 50.0;
        let mut alt_m = 0.0;
        let mut vel_ms = 0.0;

        for _ in 0..2000 {
            let demand = ctrl.step(100.0, alt_m, vel_ms, None, dt_s, &params);
            assert!(demand.abs() <= params.max_vert_speed_ms + 1e-12);

            vel_ms = demand;
            alt_m += vel_ms * dt_s;
        }

        // With sane gains the craft actually gets there
        assert!((alt_m - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_smoothed_target_primes_from_current_altitude() {
        let params = test_params();
        let mut ctrl = VertCtrl::new(&params);

        assert!(ctrl.smoothed_target_m().is_none());

        // First step primes from the craft's altitude, so the target starts
        // near 50 and blends towards 100 rather than jumping
        ctrl.step(100.0, 50.0, 0.0, None, 0.02, &params);
        let target = ctrl.smoothed_target_m().unwrap();
        assert!(target.is_finite());
        assert!(target > 50.0 && target < 100.0);

        // Reset drops the priming
        ctrl.reset();
        assert!(ctrl.smoothed_target_m().is_none());
    }

    #[test]
    fn test_smoothing_converges() {
        let params = test_params();
        let mut ctrl = VertCtrl::new(&params);

        for _ in 0..1000 {
            ctrl.step(30.0, 0.0, 0.0, None, 0.02, &params);
        }

        assert!((ctrl.smoothed_target_m().unwrap() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_ground_floor_clamp() {
        let params = test_params();
        let mut ctrl = VertCtrl::new(&params);

        // Target well below the ground: the smoothed target must never go
        // under ground + hover height
        for _ in 0..200 {
            ctrl.step(-50.0, 10.0, 0.0, Some(5.0), 0.02, &params);
            assert!(ctrl.smoothed_target_m().unwrap() >= 5.0 + params.hover_height_m - 1e-12);
        }

        // A probe miss skips the clamp
        let mut ctrl = VertCtrl::new(&params);
        for _ in 0..1000 {
            ctrl.step(-50.0, 10.0, 0.0, None, 0.02, &params);
        }
        assert!(ctrl.smoothed_target_m().unwrap() < 0.0);
    }

    #[test]
    fn test_smooth_factor_endpoints() {
        // Factor 1 follows the raw target immediately
        let mut params = test_params();
        params.alt_smooth_factor = 1.0;
        let mut ctrl = VertCtrl::new(&params);
        ctrl.step(80.0, 0.0, 0.0, None, 0.02, &params);
        assert!((ctrl.smoothed_target_m().unwrap() - 80.0).abs() < 1e-9);

        // Factor 0 freezes the target at its primed value
        let mut params = test_params();
        params.alt_smooth_factor = 0.0;
        let mut ctrl = VertCtrl::new(&params);
        for _ in 0..100 {
            ctrl.step(80.0, 5.0, 0.0, None, 0.02, &params);
            assert!((ctrl.smoothed_target_m().unwrap() - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rate_limit() {
        let mut params = test_params();
        params.max_alt_rate_ms = 1.0;
        let mut ctrl = VertCtrl::new(&params);

        let dt_s = 0.02;
        let mut prev_m = None;

        for _ in 0..100 {
            ctrl.step(1000.0, 0.0, 0.0, None, dt_s, &params);
            let target = ctrl.smoothed_target_m().unwrap();

            if let Some(prev) = prev_m {
                let step: f64 = target - prev;
                assert!(step.abs() <= params.max_alt_rate_ms * dt_s + 1e-12);
            }
            prev_m = Some(target);
        }
    }

    #[test]
    fn test_pid_reset() {
        let mut pid = PidController::new(1.0, 0.0, 1.0);

        pid.update(10.0, 0.1);
        pid.update(10.0, 0.1);
        pid.reset();

        // After a reset the integral is gone and the derivative sees the
        // full error again
        let out = pid.update(1.0, 1.0);
        assert!((out - 2.0).abs() < 1e-12);
    }
}
