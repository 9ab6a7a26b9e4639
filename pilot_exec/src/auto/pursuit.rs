//! # Pursuit planner
//!
//! Carrot-following planner: given the craft's position and speed it
//! projects the craft onto the lead path segment, pushes an aim point ahead
//! of that projection by a speed-scaled look-ahead distance, and reports how
//! much the craft should slow for an upcoming corner. The aim point is
//! always strictly ahead of the craft's progress along the path, which
//! prevents the heading controller from circling a point behind the craft.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::nav_mgr::Params;
use super::path::WaypointPath;
use nalgebra::Vector3;
use util::maths::{clamp01, lin_map};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Floor on the parametric progress along the lead segment. Keeps the base
/// aim point from falling behind the craft's projection.
const MIN_PROGRESS_T: f64 = 0.02;

/// Unclamped parametric progress beyond which the craft has overshot the
/// segment target and the lead segment advances.
const OVERSHOOT_T: f64 = 1.001;

/// The lead segment also advances when the craft comes within this multiple
/// of the arrival radius of the segment target.
const CAPTURE_RADIUS_FACTOR: f64 = 1.2;

/// Minimum squared horizontal segment length used as a projection
/// denominator, guarding degenerate (zero length) segments.
const MIN_SEG_DENOM_M2: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The output of one planning pass.
#[derive(Debug, Clone, Copy)]
pub struct PursuitSolution {
    /// The aim point the heading and thrust controllers should steer
    /// towards.
    pub aim_point_m: Vector3<f64>,

    /// Speed multiplier in [corner_min_speed_scale, 1], below 1 when a sharp
    /// corner is coming up within the preview distance.
    pub corner_speed_scale: f64,

    /// The (possibly advanced) lead segment index, clamped to the last
    /// segment.
    pub index: usize,

    /// The look-ahead distance used for this pass.
    pub look_ahead_m: f64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Plan the pursuit aim point for the current tick.
///
/// `path` must contain at least 2 points - the navigation manager
/// guarantees this for any active run.
pub fn plan(
    position_m: Vector3<f64>,
    flat_speed_ms: f64,
    path: &WaypointPath,
    index: usize,
    params: &Params,
) -> PursuitSolution {
    let points_m = &path.points_m;

    // Clamp the lead segment index to the last segment
    let last_seg = points_m.len() - 2;
    let idx = index.min(last_seg);
    let a = points_m[idx];
    let b = points_m[idx + 1];

    // Project the craft onto the lead segment in the horizontal plane only,
    // so that altitude offsets don't distort progress along the path
    let ab2 = (b - a).xy();
    let denom = ab2.norm_squared().max(MIN_SEG_DENOM_M2);
    let t_raw = (position_m.xy() - a.xy()).dot(&ab2) / denom;

    // The floor keeps the base aim strictly ahead of the craft
    let t = t_raw.max(MIN_PROGRESS_T).min(1.0);

    // Base aim point in full 3D, preserving the path's vertical profile
    let mut aim_m = a + (b - a) * t;

    // Speed-scaled look-ahead distance, always within [min, max]
    let speed_frac = clamp01(
        params.look_ahead_speed_blend * clamp01(flat_speed_ms / params.cruise_speed_ms),
    );
    let look_ahead_m = lin_map(
        (0.0, 1.0),
        (params.look_ahead_min_m, params.look_ahead_max_m),
        speed_frac,
    );

    // March the aim point forward along subsequent segments, stopping at the
    // path end
    let mut seg = idx;
    let mut remaining_m = look_ahead_m;
    while remaining_m > 0.0 {
        let end = points_m[seg + 1];
        let to_end_m = (end - aim_m).norm();

        if to_end_m > remaining_m {
            // Marching finishes within this segment
            aim_m += (end - aim_m) * (remaining_m / to_end_m);
            break;
        }

        remaining_m -= to_end_m;
        aim_m = end;

        if seg == last_seg {
            // Path end reached
            break;
        }
        seg += 1;
    }

    // Corner slowdown: if the aim point is approaching a corner and the
    // segment after it bends away, scale the desired speed down with the
    // bend angle
    let mut corner_speed_scale = 1.0;
    if seg < last_seg {
        let dist_to_corner_m = (points_m[seg + 1] - aim_m).norm();

        if dist_to_corner_m < params.corner_preview_m {
            // Bend angle between the segment into the corner and the segment
            // out of it, in the horizontal plane. Vertical segments carry a
            // zero direction and are skipped.
            let segs = (
                path.get_segment_to_target(seg + 1),
                path.get_segment_to_target(seg + 2),
            );

            if let (Some(cur), Some(next)) = segs {
                if cur.flat_length_m > f64::EPSILON && next.flat_length_m > f64::EPSILON {
                    let cos_theta = cur.direction2.dot(&next.direction2).clamp(-1.0, 1.0);
                    let theta_deg = cos_theta.acos().to_degrees();

                    corner_speed_scale = lin_map(
                        (0.0, 1.0),
                        (1.0, params.corner_min_speed_scale),
                        clamp01(theta_deg / 90.0),
                    );
                }
            }
        }
    }

    // Advance the lead segment once the craft has overshot the segment
    // target or come within capture range of it, using the unclamped
    // parametric progress for overshoot detection
    let captured =
        (position_m.xy() - b.xy()).norm() <= CAPTURE_RADIUS_FACTOR * params.arrival_radius_m;
    let index = if t_raw >= OVERSHOOT_T || captured {
        (idx + 1).min(last_seg)
    } else {
        idx
    };

    PursuitSolution {
        aim_point_m: aim_m,
        corner_speed_scale,
        index,
        look_ahead_m,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_params() -> Params {
        let mut p = Params::default();
        p.cruise_speed_ms = 5.0;
        p.arrival_radius_m = 1.0;
        p.look_ahead_min_m = 2.0;
        p.look_ahead_max_m = 10.0;
        p.look_ahead_speed_blend = 1.0;
        p.corner_preview_m = 6.0;
        p.corner_min_speed_scale = 0.35;
        p
    }

    fn right_angle_path() -> WaypointPath {
        WaypointPath::from_points(&[
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(20.0, 0.0, 0.0),
            Vector3::new(20.0, 20.0, 0.0),
        ])
    }

    #[test]
    fn test_look_ahead_bounds() {
        let params = test_params();
        let points = right_angle_path();

        for speed in &[0.0, 0.5, 2.5, 5.0, 50.0, 1e6] {
            let sol = plan(Vector3::new(1.0, 0.0, 0.0), *speed, &points, 0, &params);
            assert!(sol.look_ahead_m >= params.look_ahead_min_m);
            assert!(sol.look_ahead_m <= params.look_ahead_max_m);
        }

        // Zero speed gets the minimum, cruise speed and above get the
        // maximum
        let sol = plan(Vector3::new(1.0, 0.0, 0.0), 0.0, &points, 0, &params);
        assert!((sol.look_ahead_m - params.look_ahead_min_m).abs() < 1e-12);
        let sol = plan(Vector3::new(1.0, 0.0, 0.0), 10.0, &points, 0, &params);
        assert!((sol.look_ahead_m - params.look_ahead_max_m).abs() < 1e-12);
    }

    #[test]
    fn test_aim_always_ahead() {
        let params = test_params();
        let points = right_angle_path();

        // Even with the craft sitting behind the segment start, the aim
        // point sits ahead of the parametric floor plus the look-ahead
        let sol = plan(Vector3::new(-5.0, 0.0, 0.0), 0.0, &points, 0, &params);
        assert!(sol.aim_point_m[0] >= 20.0 * MIN_PROGRESS_T + params.look_ahead_min_m - 1e-9);
    }

    #[test]
    fn test_corner_scale_bounds() {
        let params = test_params();
        let points = right_angle_path();

        // Craft just before the corner, slow (minimum look-ahead)
        for x in &[0.0, 5.0, 14.0, 17.0, 19.0, 19.9] {
            let sol = plan(Vector3::new(*x, 0.0, 0.0), 0.0, &points, 0, &params);
            assert!(sol.corner_speed_scale >= params.corner_min_speed_scale - 1e-12);
            assert!(sol.corner_speed_scale <= 1.0 + 1e-12);
        }

        // Far from the corner: no slowdown
        let sol = plan(Vector3::new(2.0, 0.0, 0.0), 0.0, &points, 0, &params);
        assert!((sol.corner_speed_scale - 1.0).abs() < 1e-12);

        // Close to the 90 degree corner: full slowdown
        let sol = plan(Vector3::new(17.0, 0.0, 0.0), 0.0, &points, 0, &params);
        assert!((sol.corner_speed_scale - params.corner_min_speed_scale).abs() < 1e-12);
    }

    #[test]
    fn test_advance_on_overshoot() {
        let params = test_params();
        let points = right_angle_path();

        // Just short of the target: no advance
        let sol = plan(Vector3::new(18.0, 5.0, 0.0), 0.0, &points, 0, &params);
        assert_eq!(sol.index, 0);

        // Overshot the segment target in the horizontal plane
        let sol = plan(Vector3::new(20.5, 5.0, 0.0), 0.0, &points, 0, &params);
        assert_eq!(sol.index, 1);
    }

    #[test]
    fn test_advance_on_capture() {
        let params = test_params();
        let points = right_angle_path();

        // Within 1.2 x arrival radius of the segment target
        let sol = plan(Vector3::new(19.0, 0.5, 0.0), 0.0, &points, 0, &params);
        assert_eq!(sol.index, 1);

        // Index never exceeds the last segment
        let sol = plan(Vector3::new(20.0, 20.0, 0.0), 0.0, &points, 1, &params);
        assert_eq!(sol.index, 1);
    }

    #[test]
    fn test_aim_stops_at_path_end() {
        let params = test_params();
        let points = right_angle_path();

        let sol = plan(Vector3::new(20.0, 19.5, 0.0), 50.0, &points, 1, &params);
        assert_eq!(sol.aim_point_m, Vector3::new(20.0, 20.0, 0.0));
    }

    #[test]
    fn test_degenerate_segment() {
        let params = test_params();
        // Zero length lead segment must not produce NaN
        let points = WaypointPath {
            points_m: vec![
                Vector3::new(5.0, 5.0, 0.0),
                Vector3::new(5.0, 5.0, 0.0),
                Vector3::new(10.0, 5.0, 0.0),
            ],
        };

        let sol = plan(Vector3::new(0.0, 0.0, 0.0), 2.0, &points, 0, &params);
        assert!(sol.aim_point_m.iter().all(|c| c.is_finite()));
        assert!(sol.corner_speed_scale.is_finite());
    }

    #[test]
    fn test_vertical_profile_preserved() {
        let params = test_params();
        let points = WaypointPath {
            points_m: vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(100.0, 0.0, 50.0)],
        };

        // Base aim interpolates in 3D, so the aim climbs with the path
        let sol = plan(Vector3::new(50.0, 0.0, 25.0), 0.0, &points, 0, &params);
        assert!(sol.aim_point_m[2] > 25.0);
    }
}
